//! Pre-operation hooks.
//!
//! Listeners run in registration order before a public operation touches
//! the store or the tree. The first listener that returns `false` vetoes
//! the call: queries then answer "not authorized" or an empty set, and
//! mutations return `Ok(())` without doing anything.
//!
//! Every hook defaults to `true`, so a listener only overrides what it
//! cares about.

use warden_core::TenantId;

/// Observer and veto point for authorization operations.
///
/// # Example
///
/// ```
/// use warden_authz::AuthorizationListener;
/// use warden_core::TenantId;
///
/// /// Refuses to let anyone touch the audit subtree.
/// struct FreezeAudit;
///
/// impl AuthorizationListener for FreezeAudit {
///     fn clear_resource_authorizations(&self, _tenant: TenantId, resource: &str) -> bool {
///         !resource.starts_with("/audit")
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait AuthorizationListener: Send + Sync {
    /// Before `is_role_authorized`.
    fn is_role_authorized(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `is_user_authorized`.
    fn is_user_authorized(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `allowed_roles_for_resource`.
    fn allowed_roles_for_resource(&self, tenant: TenantId, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `denied_roles_for_resource`.
    fn denied_roles_for_resource(&self, tenant: TenantId, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `explicitly_allowed_users_for_resource`.
    fn explicitly_allowed_users_for_resource(
        &self,
        tenant: TenantId,
        resource: &str,
        action: &str,
    ) -> bool {
        true
    }

    /// Before `explicitly_denied_users_for_resource`.
    fn explicitly_denied_users_for_resource(
        &self,
        tenant: TenantId,
        resource: &str,
        action: &str,
    ) -> bool {
        true
    }

    /// Before `allowed_ui_resources_for_user`.
    fn allowed_ui_resources_for_user(&self, tenant: TenantId, user: &str, root: Option<&str>) -> bool {
        true
    }

    /// Before `authorize_role`.
    fn authorize_role(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `deny_role`.
    fn deny_role(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `authorize_user`.
    fn authorize_user(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `deny_user`.
    fn deny_user(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `add_authorization`.
    fn add_authorization(
        &self,
        tenant: TenantId,
        subject: &str,
        resource: &str,
        action: &str,
        allowed: bool,
        is_role: bool,
    ) -> bool {
        true
    }

    /// Before `clear_resource_authorizations`.
    fn clear_resource_authorizations(&self, tenant: TenantId, resource: &str) -> bool {
        true
    }

    /// Before `clear_role_authorizations`.
    fn clear_role_authorizations(&self, tenant: TenantId, role: &str) -> bool {
        true
    }

    /// Before `clear_role_authorization` and `clear_role_action_on_all_resources`.
    ///
    /// `resource` is `None` when the action is cleared on every resource.
    fn clear_role_authorization(
        &self,
        tenant: TenantId,
        role: &str,
        resource: Option<&str>,
        action: &str,
    ) -> bool {
        true
    }

    /// Before `clear_user_authorizations`.
    fn clear_user_authorizations(&self, tenant: TenantId, user: &str) -> bool {
        true
    }

    /// Before `clear_user_authorization`.
    fn clear_user_authorization(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        true
    }

    /// Before `reset_permission_on_update_role`.
    fn reset_permission_on_update_role(&self, tenant: TenantId, old: &str, new: &str) -> bool {
        true
    }
}
