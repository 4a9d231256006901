//! Public authorization manager.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use warden_core::{Decision, SubjectKind, TenantId};
use warden_store::PermissionStore;

use crate::bootstrap;
use crate::cache::{AuthorizationCache, CacheSettings, CacheStats};
use crate::config::ManagerConfig;
use crate::engine::AuthorizationEngine;
use crate::error::AuthzResult;
use crate::listener::AuthorizationListener;
use crate::membership::{NoRoles, RoleResolver};

/// Tenant-scoped authorization manager.
///
/// Wraps an [`AuthorizationEngine`] with the listener chain: every public
/// operation validates its input, asks each listener in order, and only then
/// reaches the engine. Cloning is cheap and shares all state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_authz::AuthorizationManager;
/// use warden_store::InMemoryStore;
///
/// # tokio_test::block_on(async {
/// let manager = AuthorizationManager::builder(Arc::new(InMemoryStore::new()))
///     .build()
///     .await
///     .unwrap();
///
/// manager.authorize_role("manager", "/apps/billing", "read").await.unwrap();
/// manager.deny_role("manager", "/apps/billing/audit", "read").await.unwrap();
///
/// assert!(manager.is_role_authorized("manager", "/apps/billing/reports", "read").await.unwrap());
/// assert!(!manager.is_role_authorized("manager", "/apps/billing/audit", "read").await.unwrap());
/// # });
/// ```
#[derive(Clone)]
pub struct AuthorizationManager {
    engine: Arc<AuthorizationEngine>,
    listeners: Arc<[Arc<dyn AuthorizationListener>]>,
}

impl fmt::Debug for AuthorizationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationManager")
            .field("engine", &self.engine)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AuthorizationManager {
    /// Starts building a manager on top of `store`.
    pub fn builder(store: Arc<dyn PermissionStore>) -> AuthorizationManagerBuilder {
        AuthorizationManagerBuilder::new(store)
    }

    /// The listener-free engine underneath.
    pub fn engine(&self) -> &Arc<AuthorizationEngine> {
        &self.engine
    }

    /// Tenant the manager serves.
    pub fn tenant_id(&self) -> TenantId {
        self.engine.tenant_id()
    }

    /// Decision cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.engine.cache_stats()
    }

    /// Strips tenant-domain suffixes from role names.
    pub fn normalize_roles(&self, roles: &[String]) -> Vec<String> {
        self.engine.normalize_roles(roles)
    }

    fn permits(&self, operation: &'static str, check: impl Fn(&dyn AuthorizationListener) -> bool) -> bool {
        let permitted = self.listeners.iter().all(|listener| check(listener.as_ref()));
        if !permitted {
            debug!(tenant = %self.tenant_id(), operation, "vetoed by listener");
        }
        permitted
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns true if `role` is allowed `action` on `resource`.
    ///
    /// # Errors
    ///
    /// `InvalidInput`/`InvalidAction` for bad arguments, `Store` if the tree
    /// cannot be refreshed.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn is_role_authorized(&self, role: &str, resource: &str, action: &str) -> AuthzResult<bool> {
        let tenant = self.tenant_id();
        let target = self.engine.target("is_role_authorized", resource, action)?;
        self.engine.subject("is_role_authorized", role, SubjectKind::Role)?;
        if !self.permits("is_role_authorized", |l| {
            l.is_role_authorized(tenant, role, resource, action)
        }) {
            return Ok(false);
        }
        self.engine.role_decision(role, &target).await
    }

    /// Returns true if `user` is allowed `action` on `resource`.
    ///
    /// The configured system user is always allowed. Otherwise the user's
    /// own rulings are checked first, then membership in any role the tree
    /// allows. The outcome is cached.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn is_user_authorized(&self, user: &str, resource: &str, action: &str) -> AuthzResult<bool> {
        let tenant = self.tenant_id();
        let target = self.engine.target("is_user_authorized", resource, action)?;
        self.engine.subject("is_user_authorized", user, SubjectKind::User)?;
        if self.engine.is_system_user(user) {
            return Ok(true);
        }
        if !self.permits("is_user_authorized", |l| {
            l.is_user_authorized(tenant, user, resource, action)
        }) {
            return Ok(false);
        }
        self.engine.user_decision(user, &target).await
    }

    async fn reverse(
        &self,
        operation: &'static str,
        resource: &str,
        action: &str,
        wanted: Decision,
        kind: SubjectKind,
        check: impl Fn(&dyn AuthorizationListener) -> bool,
    ) -> AuthzResult<BTreeSet<String>> {
        let target = self.engine.target(operation, resource, action)?;
        if !self.permits(operation, check) {
            return Ok(BTreeSet::new());
        }
        self.engine.subjects(operation, &target, wanted, kind).await
    }

    /// Roles with an explicit allow at or below `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn allowed_roles_for_resource(&self, resource: &str, action: &str) -> AuthzResult<BTreeSet<String>> {
        let tenant = self.tenant_id();
        self.reverse(
            "allowed_roles_for_resource",
            resource,
            action,
            Decision::Allow,
            SubjectKind::Role,
            |l| l.allowed_roles_for_resource(tenant, resource, action),
        )
        .await
    }

    /// Roles with an explicit deny at or below `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn denied_roles_for_resource(&self, resource: &str, action: &str) -> AuthzResult<BTreeSet<String>> {
        let tenant = self.tenant_id();
        self.reverse(
            "denied_roles_for_resource",
            resource,
            action,
            Decision::Deny,
            SubjectKind::Role,
            |l| l.denied_roles_for_resource(tenant, resource, action),
        )
        .await
    }

    /// Users with an explicit allow at or below `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn explicitly_allowed_users_for_resource(
        &self,
        resource: &str,
        action: &str,
    ) -> AuthzResult<BTreeSet<String>> {
        let tenant = self.tenant_id();
        self.reverse(
            "explicitly_allowed_users_for_resource",
            resource,
            action,
            Decision::Allow,
            SubjectKind::User,
            |l| l.explicitly_allowed_users_for_resource(tenant, resource, action),
        )
        .await
    }

    /// Users with an explicit deny at or below `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn explicitly_denied_users_for_resource(
        &self,
        resource: &str,
        action: &str,
    ) -> AuthzResult<BTreeSet<String>> {
        let tenant = self.tenant_id();
        self.reverse(
            "explicitly_denied_users_for_resource",
            resource,
            action,
            Decision::Deny,
            SubjectKind::User,
            |l| l.explicitly_denied_users_for_resource(tenant, resource, action),
        )
        .await
    }

    /// Topmost UI resources `user` may execute, optionally under `root`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn allowed_ui_resources_for_user(&self, user: &str, root: Option<&str>) -> AuthzResult<Vec<String>> {
        let tenant = self.tenant_id();
        self.engine
            .subject("allowed_ui_resources_for_user", user, SubjectKind::User)?;
        if !self.permits("allowed_ui_resources_for_user", |l| {
            l.allowed_ui_resources_for_user(tenant, user, root)
        }) {
            return Ok(Vec::new());
        }
        self.engine.allowed_ui_resources_for_user(user, root).await
    }

    // ------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    async fn grant(
        &self,
        operation: &'static str,
        subject: &str,
        kind: SubjectKind,
        resource: &str,
        action: &str,
        allowed: bool,
        check: impl Fn(&dyn AuthorizationListener) -> bool,
    ) -> AuthzResult<()> {
        self.engine.target(operation, resource, action)?;
        self.engine.subject(operation, subject, kind)?;
        if !self.permits(operation, check) {
            return Ok(());
        }
        self.engine
            .set_grant(operation, subject, kind, resource, action, allowed)
            .await
    }

    /// Allows `role` `action` on `resource` and its descendants.
    ///
    /// Replaces a deny for the same role, resource and action.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn authorize_role(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.grant("authorize_role", role, SubjectKind::Role, resource, action, true, |l| {
            l.authorize_role(tenant, role, resource, action)
        })
        .await
    }

    /// Denies `role` `action` on `resource` and its descendants.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn deny_role(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.grant("deny_role", role, SubjectKind::Role, resource, action, false, |l| {
            l.deny_role(tenant, role, resource, action)
        })
        .await
    }

    /// Allows `user` `action` on `resource` and its descendants.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn authorize_user(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.grant("authorize_user", user, SubjectKind::User, resource, action, true, |l| {
            l.authorize_user(tenant, user, resource, action)
        })
        .await
    }

    /// Denies `user` `action` on `resource` and its descendants.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn deny_user(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.grant("deny_user", user, SubjectKind::User, resource, action, false, |l| {
            l.deny_user(tenant, user, resource, action)
        })
        .await
    }

    /// Records one grant for a role (`is_role`) or a user.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn add_authorization(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        allowed: bool,
        is_role: bool,
    ) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.grant(
            "add_authorization",
            subject,
            SubjectKind::from_is_role(is_role),
            resource,
            action,
            allowed,
            |l| l.add_authorization(tenant, subject, resource, action, allowed, is_role),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------

    /// Removes every grant on `resource`, for all subjects and actions.
    ///
    /// On failure nothing is removed.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_resource_authorizations(&self, resource: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .require_resource("clear_resource_authorizations", resource)?;
        if !self.permits("clear_resource_authorizations", |l| {
            l.clear_resource_authorizations(tenant, resource)
        }) {
            return Ok(());
        }
        self.engine.clear_resource_authorizations(resource).await
    }

    /// Removes every grant of `role`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_role_authorizations(&self, role: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .subject("clear_role_authorizations", role, SubjectKind::Role)?;
        if !self.permits("clear_role_authorizations", |l| {
            l.clear_role_authorizations(tenant, role)
        }) {
            return Ok(());
        }
        self.engine.clear_role_authorizations(role).await
    }

    /// Removes the grant of `role` for `action` on exactly `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_role_authorization(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .target("clear_role_authorization", resource, action)?;
        self.engine
            .subject("clear_role_authorization", role, SubjectKind::Role)?;
        if !self.permits("clear_role_authorization", |l| {
            l.clear_role_authorization(tenant, role, Some(resource), action)
        }) {
            return Ok(());
        }
        self.engine
            .clear_role_authorization(role, resource, action)
            .await
    }

    /// Removes the grants of `role` for `action` on every resource.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_role_action_on_all_resources(&self, role: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .action("clear_role_action_on_all_resources", action)?;
        self.engine
            .subject("clear_role_action_on_all_resources", role, SubjectKind::Role)?;
        if !self.permits("clear_role_action_on_all_resources", |l| {
            l.clear_role_authorization(tenant, role, None, action)
        }) {
            return Ok(());
        }
        self.engine
            .clear_role_action_on_all_resources(role, action)
            .await
    }

    /// Removes every grant of `user`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_user_authorizations(&self, user: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .subject("clear_user_authorizations", user, SubjectKind::User)?;
        if !self.permits("clear_user_authorizations", |l| {
            l.clear_user_authorizations(tenant, user)
        }) {
            return Ok(());
        }
        self.engine.clear_user_authorizations(user).await
    }

    /// Removes the grant of `user` for `action` on exactly `resource`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn clear_user_authorization(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .target("clear_user_authorization", resource, action)?;
        self.engine
            .subject("clear_user_authorization", user, SubjectKind::User)?;
        if !self.permits("clear_user_authorization", |l| {
            l.clear_user_authorization(tenant, user, resource, action)
        }) {
            return Ok(());
        }
        self.engine
            .clear_user_authorization(user, resource, action)
            .await
    }

    /// Re-keys every grant of role `old` to role `new`.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn reset_permission_on_update_role(&self, old: &str, new: &str) -> AuthzResult<()> {
        let tenant = self.tenant_id();
        self.engine
            .subject("reset_permission_on_update_role", old, SubjectKind::Role)?;
        self.engine
            .subject("reset_permission_on_update_role", new, SubjectKind::Role)?;
        if !self.permits("reset_permission_on_update_role", |l| {
            l.reset_permission_on_update_role(tenant, old, new)
        }) {
            return Ok(());
        }
        self.engine.reset_permission_on_update_role(old, new).await
    }

    // ------------------------------------------------------------------
    // Tree lifecycle
    // ------------------------------------------------------------------

    /// Drops the in-memory tree and cached decisions; the next query
    /// reloads from the store.
    pub async fn clear_permission_tree(&self) {
        self.engine.clear_permission_tree().await;
    }

    /// Reloads the tree from a full store snapshot.
    #[instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn populate_permission_tree(&self) -> AuthzResult<()> {
        self.engine.populate_permission_tree().await
    }
}

/// Builder for [`AuthorizationManager`].
pub struct AuthorizationManagerBuilder {
    store: Arc<dyn PermissionStore>,
    config: ManagerConfig,
    resolver: Option<Arc<dyn RoleResolver>>,
    listeners: Vec<Arc<dyn AuthorizationListener>>,
    cache: Option<Arc<AuthorizationCache>>,
}

impl fmt::Debug for AuthorizationManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationManagerBuilder")
            .field("store", &self.store.backend_name())
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl AuthorizationManagerBuilder {
    fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            config: ManagerConfig::default(),
            resolver: None,
            listeners: Vec::new(),
            cache: None,
        }
    }

    /// Sets the manager configuration.
    #[must_use]
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the role membership collaborator. Without one, users hold no
    /// roles.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn RoleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Appends a listener; listeners run in the order they were added.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Shares an existing decision cache instead of creating one.
    #[must_use]
    pub fn cache(mut self, cache: Arc<AuthorizationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the manager and writes the configured startup grants.
    ///
    /// # Errors
    ///
    /// `Config` if the action vocabulary cannot be built, `Store` or
    /// `Rollback` if the startup grants cannot be written.
    pub async fn build(self) -> AuthzResult<AuthorizationManager> {
        let config = self.config;
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(AuthorizationCache::new(
                config.cache_identifier.clone(),
                CacheSettings {
                    enabled: config.cache_enabled,
                    max_entries: config.cache_max_entries,
                    ttl: config.cache_ttl,
                },
            ))
        });
        let resolver = self.resolver.unwrap_or_else(|| Arc::new(NoRoles));

        let engine = AuthorizationEngine::new(config, self.store, resolver, cache)?;
        bootstrap::run(&engine).await?;

        info!(
            tenant = %engine.tenant_id(),
            cache = %engine.cache().identifier(),
            listeners = self.listeners.len(),
            "authorization manager ready"
        );

        Ok(AuthorizationManager {
            engine: Arc::new(engine),
            listeners: self.listeners.into(),
        })
    }
}
