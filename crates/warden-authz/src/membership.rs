//! Role membership collaborator.

use async_trait::async_trait;
use thiserror::Error;
use warden_core::TenantId;

/// A role membership lookup failed.
///
/// The manager treats a failed lookup as "no roles".
#[derive(Debug, Clone, Error)]
#[error("role membership lookup failed: {0}")]
pub struct MembershipError(pub String);

impl MembershipError {
    /// Creates a membership error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What the user store behind a resolver looks like.
///
/// Consulted when the admin role is bootstrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStoreInfo {
    /// The user store cannot be written to.
    pub read_only: bool,
    /// Whether a read-only store exposes its groups as roles.
    pub read_groups: Option<bool>,
    /// Domain name of the user store.
    pub domain: Option<String>,
}

/// Answers which roles a user holds.
///
/// User-store management is out of scope; implementations wrap whatever
/// directory the deployment uses.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Lists every role of `user`.
    async fn roles_of_user(&self, tenant: TenantId, user: &str)
        -> Result<Vec<String>, MembershipError>;

    /// Returns true if `user` holds `role`.
    async fn is_user_in_role(
        &self,
        tenant: TenantId,
        user: &str,
        role: &str,
    ) -> Result<bool, MembershipError>;

    /// Describes the backing user store.
    fn user_store(&self) -> UserStoreInfo {
        UserStoreInfo::default()
    }
}

/// Resolver for deployments without a user store: nobody holds any role.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoles;

#[async_trait]
impl RoleResolver for NoRoles {
    async fn roles_of_user(
        &self,
        _tenant: TenantId,
        _user: &str,
    ) -> Result<Vec<String>, MembershipError> {
        Ok(Vec::new())
    }

    async fn is_user_in_role(
        &self,
        _tenant: TenantId,
        _user: &str,
        _role: &str,
    ) -> Result<bool, MembershipError> {
        Ok(false)
    }
}
