//! Listener that records hook calls and vetoes on demand.

use std::collections::HashSet;

use parking_lot::Mutex;
use warden_authz::AuthorizationListener;
use warden_core::TenantId;

/// One hook invocation seen by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerCall {
    /// Hook name, e.g. `"authorize_role"`.
    pub hook: &'static str,
    /// Tenant the operation ran for.
    pub tenant: TenantId,
    /// Hook arguments after the tenant, in order. `None` roots render as `"-"`.
    pub args: Vec<String>,
}

/// An [`AuthorizationListener`] that records every hook call.
///
/// Hooks named in [`vetoing`](Self::vetoing) return `false`; all others
/// return `true`.
#[derive(Debug, Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<ListenerCall>>,
    vetoed: HashSet<&'static str>,
}

impl RecordingListener {
    /// Creates a listener that approves everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a listener that vetoes the named hooks.
    pub fn vetoing(hooks: &[&'static str]) -> Self {
        Self {
            calls: Mutex::default(),
            vetoed: hooks.iter().copied().collect(),
        }
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<ListenerCall> {
        self.calls.lock().clone()
    }

    /// Names of the hooks called so far, in order.
    pub fn hooks(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|call| call.hook).collect()
    }

    fn record(&self, hook: &'static str, tenant: TenantId, args: &[&str]) -> bool {
        self.calls.lock().push(ListenerCall {
            hook,
            tenant,
            args: args.iter().map(ToString::to_string).collect(),
        });
        !self.vetoed.contains(hook)
    }
}

impl AuthorizationListener for RecordingListener {
    fn is_role_authorized(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        self.record("is_role_authorized", tenant, &[role, resource, action])
    }

    fn is_user_authorized(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        self.record("is_user_authorized", tenant, &[user, resource, action])
    }

    fn allowed_roles_for_resource(&self, tenant: TenantId, resource: &str, action: &str) -> bool {
        self.record("allowed_roles_for_resource", tenant, &[resource, action])
    }

    fn denied_roles_for_resource(&self, tenant: TenantId, resource: &str, action: &str) -> bool {
        self.record("denied_roles_for_resource", tenant, &[resource, action])
    }

    fn explicitly_allowed_users_for_resource(
        &self,
        tenant: TenantId,
        resource: &str,
        action: &str,
    ) -> bool {
        self.record(
            "explicitly_allowed_users_for_resource",
            tenant,
            &[resource, action],
        )
    }

    fn explicitly_denied_users_for_resource(
        &self,
        tenant: TenantId,
        resource: &str,
        action: &str,
    ) -> bool {
        self.record(
            "explicitly_denied_users_for_resource",
            tenant,
            &[resource, action],
        )
    }

    fn allowed_ui_resources_for_user(
        &self,
        tenant: TenantId,
        user: &str,
        root: Option<&str>,
    ) -> bool {
        self.record(
            "allowed_ui_resources_for_user",
            tenant,
            &[user, root.unwrap_or("-")],
        )
    }

    fn authorize_role(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        self.record("authorize_role", tenant, &[role, resource, action])
    }

    fn deny_role(&self, tenant: TenantId, role: &str, resource: &str, action: &str) -> bool {
        self.record("deny_role", tenant, &[role, resource, action])
    }

    fn authorize_user(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        self.record("authorize_user", tenant, &[user, resource, action])
    }

    fn deny_user(&self, tenant: TenantId, user: &str, resource: &str, action: &str) -> bool {
        self.record("deny_user", tenant, &[user, resource, action])
    }

    fn add_authorization(
        &self,
        tenant: TenantId,
        subject: &str,
        resource: &str,
        action: &str,
        allowed: bool,
        is_role: bool,
    ) -> bool {
        let allowed = allowed.to_string();
        let is_role = is_role.to_string();
        self.record(
            "add_authorization",
            tenant,
            &[subject, resource, action, allowed.as_str(), is_role.as_str()],
        )
    }

    fn clear_resource_authorizations(&self, tenant: TenantId, resource: &str) -> bool {
        self.record("clear_resource_authorizations", tenant, &[resource])
    }

    fn clear_role_authorizations(&self, tenant: TenantId, role: &str) -> bool {
        self.record("clear_role_authorizations", tenant, &[role])
    }

    fn clear_role_authorization(
        &self,
        tenant: TenantId,
        role: &str,
        resource: Option<&str>,
        action: &str,
    ) -> bool {
        self.record(
            "clear_role_authorization",
            tenant,
            &[role, resource.unwrap_or("-"), action],
        )
    }

    fn clear_user_authorizations(&self, tenant: TenantId, user: &str) -> bool {
        self.record("clear_user_authorizations", tenant, &[user])
    }

    fn clear_user_authorization(
        &self,
        tenant: TenantId,
        user: &str,
        resource: &str,
        action: &str,
    ) -> bool {
        self.record("clear_user_authorization", tenant, &[user, resource, action])
    }

    fn reset_permission_on_update_role(&self, tenant: TenantId, old: &str, new: &str) -> bool {
        self.record("reset_permission_on_update_role", tenant, &[old, new])
    }
}
