//! In-memory role membership.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use warden_authz::{MembershipError, RoleResolver, UserStoreInfo};
use warden_core::TenantId;

/// A [`RoleResolver`] backed by a fixed user-to-roles map.
///
/// User names match case-insensitively, role names too. Lookups can be made
/// to fail with [`set_failing`](Self::set_failing).
#[derive(Debug, Default)]
pub struct StaticRoleResolver {
    memberships: RwLock<HashMap<String, BTreeSet<String>>>,
    info: UserStoreInfo,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl StaticRoleResolver {
    /// Creates a resolver where nobody holds any role.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `roles` to `user`.
    #[must_use]
    pub fn with_roles(self, user: &str, roles: &[&str]) -> Self {
        for role in roles {
            self.assign(user, role);
        }
        self
    }

    /// Reports `info` as the backing user store.
    #[must_use]
    pub fn with_user_store(mut self, info: UserStoreInfo) -> Self {
        self.info = info;
        self
    }

    /// Adds `role` to `user`.
    pub fn assign(&self, user: &str, role: &str) {
        self.memberships
            .write()
            .entry(user.to_lowercase())
            .or_default()
            .insert(role.to_string());
    }

    /// Removes `role` from `user`.
    pub fn revoke(&self, user: &str, role: &str) {
        if let Some(roles) = self.memberships.write().get_mut(&user.to_lowercase()) {
            roles.retain(|held| !held.eq_ignore_ascii_case(role));
        }
    }

    /// Makes every lookup fail while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of lookups served, failed ones included.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn roles(&self, user: &str) -> Result<BTreeSet<String>, MembershipError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MembershipError::new("directory unavailable"));
        }
        Ok(self
            .memberships
            .read()
            .get(&user.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn roles_of_user(
        &self,
        _tenant: TenantId,
        user: &str,
    ) -> Result<Vec<String>, MembershipError> {
        Ok(self.roles(user)?.into_iter().collect())
    }

    async fn is_user_in_role(
        &self,
        _tenant: TenantId,
        user: &str,
        role: &str,
    ) -> Result<bool, MembershipError> {
        Ok(self
            .roles(user)?
            .iter()
            .any(|held| held.eq_ignore_ascii_case(role)))
    }

    fn user_store(&self) -> UserStoreInfo {
        self.info.clone()
    }
}
