//! Authorization engine: queries, writes and tree synchronisation.
//!
//! The engine is the listener-free layer underneath
//! [`AuthorizationManager`](crate::AuthorizationManager). Internal callers
//! such as bootstrap and UI resource listing use it directly, so their
//! nested checks never re-enter the listener chain.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};
use warden_core::domain::strip_tenant_domain;
use warden_core::{Decision, SubjectKind, TenantId};
use warden_store::{PermissionStore, StoreError, StoreResult};
use warden_telemetry::metrics::{
    record_cache_lookup, record_decision, record_store_failure, record_write_duration,
};
use warden_tree::{collapse_prefixes, split, PermissionCategory, ResourcePath, UI_EXECUTE};

use crate::cache::{AuthorizationCache, CacheLookup, CacheStats};
use crate::config::ManagerConfig;
use crate::error::{AuthzError, AuthzResult, OperationContext};
use crate::index::{PermissionIndex, RefreshOutcome};
use crate::membership::RoleResolver;
use crate::mutation::{GrantMutation, InvalidationScope, Subject, Target};
use crate::names::Normalizer;

/// Listener-free authorization engine for one tenant.
pub struct AuthorizationEngine {
    tenant: TenantId,
    config: ManagerConfig,
    store: Arc<dyn PermissionStore>,
    resolver: Arc<dyn RoleResolver>,
    cache: Arc<AuthorizationCache>,
    index: PermissionIndex,
    names: Normalizer,
    system_user: String,
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("tenant", &self.tenant)
            .field("store", &self.store.backend_name())
            .field("cache", &self.cache.identifier())
            .field("loaded", &self.index.is_loaded())
            .finish_non_exhaustive()
    }
}

impl AuthorizationEngine {
    pub(crate) fn new(
        config: ManagerConfig,
        store: Arc<dyn PermissionStore>,
        resolver: Arc<dyn RoleResolver>,
        cache: Arc<AuthorizationCache>,
    ) -> AuthzResult<Self> {
        let vocabulary = config.vocabulary()?;
        let names = Normalizer::new(config.case_sensitive);
        let system_user = names.user(&config.system_user);
        Ok(Self {
            tenant: config.tenant,
            index: PermissionIndex::new(config.tenant, vocabulary, names),
            names,
            system_user,
            config,
            store,
            resolver,
            cache,
        })
    }

    /// Tenant the engine serves.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The decision cache.
    pub fn cache(&self) -> &Arc<AuthorizationCache> {
        &self.cache
    }

    /// The synchronised permission tree.
    pub fn index(&self) -> &PermissionIndex {
        &self.index
    }

    /// The role membership collaborator.
    pub(crate) fn resolver(&self) -> &dyn RoleResolver {
        self.resolver.as_ref()
    }

    /// Decision cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ------------------------------------------------------------------
    // Input validation
    // ------------------------------------------------------------------

    pub(crate) fn target(
        &self,
        operation: &'static str,
        resource: &str,
        action: &str,
    ) -> AuthzResult<Target> {
        if resource.trim().is_empty() {
            return Err(AuthzError::invalid_input(operation, "resource is required"));
        }
        let (category, action) = self.action(operation, action)?;
        let resource = self.names.resource(resource);
        Ok(Target {
            path: split(&resource),
            resource,
            category,
            action,
        })
    }

    /// Maps `action` to its category and registered name.
    pub(crate) fn action(
        &self,
        operation: &'static str,
        action: &str,
    ) -> AuthzResult<(PermissionCategory, String)> {
        if action.trim().is_empty() {
            return Err(AuthzError::invalid_input(operation, "action is required"));
        }
        let vocabulary = self.index.vocabulary();
        let category = vocabulary.category_of(action)?;
        let name = vocabulary
            .action_name(category)
            .map_or_else(|| action.trim().to_string(), str::to_string);
        Ok((category, name))
    }

    pub(crate) fn subject(
        &self,
        operation: &'static str,
        name: &str,
        kind: SubjectKind,
    ) -> AuthzResult<Subject> {
        if name.trim().is_empty() {
            return Err(AuthzError::invalid_input(
                operation,
                format!("{} name is required", kind.as_str()),
            ));
        }
        Ok(match kind {
            SubjectKind::Role => Subject::Role(self.names.qualified_role(name)),
            SubjectKind::User => Subject::User(self.names.user(name)),
        })
    }

    pub(crate) fn require_resource(&self, operation: &'static str, resource: &str) -> AuthzResult<String> {
        if resource.trim().is_empty() {
            return Err(AuthzError::invalid_input(operation, "resource is required"));
        }
        Ok(self.names.resource(resource))
    }

    // ------------------------------------------------------------------
    // Synchronisation
    // ------------------------------------------------------------------

    async fn sync(&self, context: impl FnOnce() -> OperationContext) -> AuthzResult<()> {
        match self.index.refresh(self.store.as_ref()).await {
            Ok(outcome) => {
                self.invalidate_for(&outcome);
                Ok(())
            }
            Err(err) => {
                record_store_failure("refresh");
                let context = context();
                warn!(tenant = %self.tenant, operation = context.operation, error = %err, "permission tree refresh failed");
                Err(AuthzError::store(context, err))
            }
        }
    }

    fn invalidate_for(&self, outcome: &RefreshOutcome) {
        if outcome.affects_tenant() {
            self.cache.invalidate_tenant(self.tenant);
        } else {
            for user in &outcome.users_changed {
                self.cache.invalidate_user(self.tenant, user);
            }
        }
    }

    /// Brings the tree up to date with the store.
    pub async fn refresh(&self) -> AuthzResult<RefreshOutcome> {
        let outcome = self
            .index
            .refresh(self.store.as_ref())
            .await
            .map_err(|e| AuthzError::store(OperationContext::new("refresh"), e))?;
        self.invalidate_for(&outcome);
        Ok(outcome)
    }

    /// Rebuilds the tree from a full store snapshot.
    pub async fn populate_permission_tree(&self) -> AuthzResult<()> {
        let outcome = self
            .index
            .full_reload(self.store.as_ref())
            .await
            .map_err(|e| AuthzError::store(OperationContext::new("populate_permission_tree"), e))?;
        self.invalidate_for(&outcome);
        Ok(())
    }

    /// Drops the in-memory tree and the tenant's cached decisions.
    ///
    /// The next query reloads the tree from the store.
    pub async fn clear_permission_tree(&self) {
        self.index.unload().await;
        self.cache.invalidate_tenant(self.tenant);
        debug!(tenant = %self.tenant, "cleared permission tree");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns true if `role` is allowed `action` on `resource`.
    pub async fn is_role_authorized(&self, role: &str, resource: &str, action: &str) -> AuthzResult<bool> {
        let target = self.target("is_role_authorized", resource, action)?;
        self.subject("is_role_authorized", role, SubjectKind::Role)?;
        self.role_decision(role, &target).await
    }

    pub(crate) async fn role_decision(&self, role: &str, target: &Target) -> AuthzResult<bool> {
        let role = self.names.role(role);
        self.sync(|| {
            OperationContext::new("is_role_authorized")
                .subject(role.as_str())
                .resource(target.resource.as_str())
                .action(target.action.as_str())
        })
        .await?;
        let allowed = self.index.read(|tree| {
            tree.point_query(&role, SubjectKind::Role, target.category, &target.path)
                .last_node_allowed_access()
        });
        record_decision("role", allowed);
        debug!(tenant = %self.tenant, role = %role, resource = %target.resource, action = %target.action, allowed, "role decision");
        Ok(allowed)
    }

    /// Returns true if `user` is allowed `action` on `resource`, directly or
    /// through one of their roles.
    pub async fn is_user_authorized(&self, user: &str, resource: &str, action: &str) -> AuthzResult<bool> {
        let target = self.target("is_user_authorized", resource, action)?;
        self.subject("is_user_authorized", user, SubjectKind::User)?;
        self.user_decision(user, &target).await
    }

    /// Returns true for the principal that bypasses every check.
    pub(crate) fn is_system_user(&self, user: &str) -> bool {
        self.names.user(user) == self.system_user
    }

    pub(crate) async fn user_decision(&self, user: &str, target: &Target) -> AuthzResult<bool> {
        if self.is_system_user(user) {
            return Ok(true);
        }
        let name = self.names.user(user);

        let caching = self.config.cache_enabled && self.cache.is_enabled();
        if caching {
            match self
                .cache
                .lookup(self.tenant, &name, &target.resource, &target.action)
            {
                CacheLookup::Hit(allowed) => {
                    record_cache_lookup(true);
                    debug!(tenant = %self.tenant, user = %name, resource = %target.resource, action = %target.action, allowed, "cache hit");
                    return Ok(allowed);
                }
                CacheLookup::Miss(_) => {
                    record_cache_lookup(false);
                    debug!(tenant = %self.tenant, user = %name, resource = %target.resource, action = %target.action, "cache miss");
                }
            }
        }

        self.sync(|| {
            OperationContext::new("is_user_authorized")
                .subject(name.as_str())
                .resource(target.resource.as_str())
                .action(target.action.as_str())
        })
        .await?;

        // Issued after the refresh: a write committed before this point is
        // already in the tree, one committed after it invalidates the ticket.
        let ticket = self.cache.ticket();
        let (direct, candidate_roles) = self.index.read(|tree| {
            let direct = tree
                .point_query(&name, SubjectKind::User, target.category, &target.path)
                .last_node_allowed_access();
            let roles = if direct {
                BTreeSet::new()
            } else {
                tree.effective_subjects(&target.path, target.category, SubjectKind::Role)
            };
            (direct, roles)
        });

        let allowed = direct || self.holds_any_role(user, &candidate_roles).await;
        if caching {
            self.cache.store(
                self.tenant,
                &name,
                &target.resource,
                &target.action,
                allowed,
                ticket,
            );
        }
        record_decision("user", allowed);
        if !allowed {
            debug!(tenant = %self.tenant, user = %name, resource = %target.resource, action = %target.action, "user denied");
        }
        Ok(allowed)
    }

    async fn holds_any_role(&self, user: &str, candidates: &BTreeSet<String>) -> bool {
        if candidates.is_empty() {
            return false;
        }
        if self.config.verify_by_retrieving_all_user_roles {
            return self
                .roles_of(user)
                .await
                .iter()
                .any(|role| candidates.contains(role));
        }
        for role in candidates {
            match self.resolver.is_user_in_role(self.tenant, user, role).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!(tenant = %self.tenant, user, role = %role, error = %err, "role membership check failed");
                }
            }
        }
        false
    }

    /// Normalized roles of `user`; a failed lookup yields none.
    async fn roles_of(&self, user: &str) -> Vec<String> {
        match self.resolver.roles_of_user(self.tenant, user).await {
            Ok(roles) => roles.iter().map(|role| self.names.role(role)).collect(),
            Err(err) => {
                warn!(tenant = %self.tenant, user, error = %err, "listing user roles failed");
                Vec::new()
            }
        }
    }

    pub(crate) async fn subjects(
        &self,
        operation: &'static str,
        target: &Target,
        wanted: Decision,
        kind: SubjectKind,
    ) -> AuthzResult<BTreeSet<String>> {
        self.sync(|| {
            OperationContext::new(operation)
                .resource(target.resource.as_str())
                .action(target.action.as_str())
        })
        .await?;
        Ok(self.index.read(|tree| {
            tree.reverse_query(&target.path, target.category, wanted, kind)
                .into_subjects()
        }))
    }

    /// Roles with an explicit allow at or below `resource`.
    pub async fn allowed_roles_for_resource(&self, resource: &str, action: &str) -> AuthzResult<BTreeSet<String>> {
        let target = self.target("allowed_roles_for_resource", resource, action)?;
        self.subjects("allowed_roles_for_resource", &target, Decision::Allow, SubjectKind::Role)
            .await
    }

    /// Roles with an explicit deny at or below `resource`.
    pub async fn denied_roles_for_resource(&self, resource: &str, action: &str) -> AuthzResult<BTreeSet<String>> {
        let target = self.target("denied_roles_for_resource", resource, action)?;
        self.subjects("denied_roles_for_resource", &target, Decision::Deny, SubjectKind::Role)
            .await
    }

    /// Users with an explicit allow at or below `resource`.
    pub async fn explicitly_allowed_users_for_resource(
        &self,
        resource: &str,
        action: &str,
    ) -> AuthzResult<BTreeSet<String>> {
        let target = self.target("explicitly_allowed_users_for_resource", resource, action)?;
        self.subjects(
            "explicitly_allowed_users_for_resource",
            &target,
            Decision::Allow,
            SubjectKind::User,
        )
        .await
    }

    /// Users with an explicit deny at or below `resource`.
    pub async fn explicitly_denied_users_for_resource(
        &self,
        resource: &str,
        action: &str,
    ) -> AuthzResult<BTreeSet<String>> {
        let target = self.target("explicitly_denied_users_for_resource", resource, action)?;
        self.subjects(
            "explicitly_denied_users_for_resource",
            &target,
            Decision::Deny,
            SubjectKind::User,
        )
        .await
    }

    /// Topmost UI resources `user` may execute, optionally under `root`.
    ///
    /// Descendants of a listed resource are not listed again.
    pub async fn allowed_ui_resources_for_user(
        &self,
        user: &str,
        root: Option<&str>,
    ) -> AuthzResult<Vec<String>> {
        self.subject("allowed_ui_resources_for_user", user, SubjectKind::User)?;
        let root = root
            .filter(|r| !r.trim().is_empty())
            .map_or_else(ResourcePath::root, |r| split(&self.names.resource(r)));

        if self.config.verify_by_retrieving_all_user_roles {
            self.sync(|| OperationContext::new("allowed_ui_resources_for_user").subject(user))
                .await?;
            let roles = self.roles_of(user).await;
            let name = self.names.user(user);
            return Ok(self.index.read(|tree| {
                tree.allowed_resources(&roles, Some(&name), PermissionCategory::UI, &root)
            }));
        }

        let candidates = self
            .store
            .resource_ids_for_action(self.tenant, UI_EXECUTE)
            .await
            .map_err(|e| {
                record_store_failure("allowed_ui_resources_for_user");
                AuthzError::store(
                    OperationContext::new("allowed_ui_resources_for_user").subject(user),
                    e,
                )
            })?;

        let mut found = Vec::new();
        for resource in candidates {
            if !split(&resource).starts_with(&root) {
                continue;
            }
            let target = self.target("allowed_ui_resources_for_user", &resource, UI_EXECUTE)?;
            if self.user_decision(user, &target).await? {
                found.push(target.resource);
            }
        }
        Ok(collapse_prefixes(found))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Runs `operation` under the configured store deadline.
    async fn within<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match self.config.store_timeout {
            Some(deadline) => tokio::time::timeout(deadline, work)
                .await
                .unwrap_or_else(|_| Err(StoreError::timeout(operation))),
            None => work.await,
        }
    }

    /// Writes `mutation` in one transaction, then brings the tree and the
    /// cache in line with the committed state.
    pub(crate) async fn write(&self, operation: &'static str, mutation: GrantMutation) -> AuthzResult<()> {
        let started = Instant::now();
        let result = self.write_inner(operation, &mutation).await;
        record_write_duration(operation, started.elapsed());
        result
    }

    async fn write_inner(&self, operation: &'static str, mutation: &GrantMutation) -> AuthzResult<()> {
        let mut tx = match self.within(operation, self.store.begin(self.tenant)).await {
            Ok(tx) => tx,
            Err(err) => {
                record_store_failure(operation);
                warn!(tenant = %self.tenant, operation, error = %err, "could not open store transaction");
                return Err(AuthzError::store(mutation.context(operation), err));
            }
        };

        let cascade = self.config.cascade_delete_enabled;
        let body = async {
            mutation.apply(tx.as_mut(), cascade).await?;
            tx.commit().await
        };
        let committed = self.within(operation, body).await;
        if let Err(err) = committed {
            record_store_failure(operation);
            warn!(tenant = %self.tenant, operation, error = %err, "store write failed; rolling back");
            return Err(match tx.rollback().await {
                Ok(()) => AuthzError::store(mutation.context(operation), err),
                Err(rollback_err) => {
                    error!(
                        tenant = %self.tenant,
                        operation,
                        error = %rollback_err,
                        original = %err,
                        "rollback failed; store state is uncertain"
                    );
                    AuthzError::rollback(mutation.context(operation), rollback_err, err)
                }
            });
        }

        // The commit is durable from here on. A failed refresh only delays
        // the tree; the next query refreshes again.
        match self.index.refresh(self.store.as_ref()).await {
            Ok(outcome) => self.invalidate_for(&outcome),
            Err(err) => {
                record_store_failure("refresh");
                warn!(tenant = %self.tenant, operation, error = %err, "tree refresh after commit failed");
            }
        }
        match mutation.scope() {
            InvalidationScope::Tenant => self.cache.invalidate_tenant(self.tenant),
            InvalidationScope::User(user) => self.cache.invalidate_user(self.tenant, &user),
        }
        debug!(tenant = %self.tenant, operation, "grant write committed");
        Ok(())
    }

    pub(crate) async fn set_grant(
        &self,
        operation: &'static str,
        subject: &str,
        kind: SubjectKind,
        resource: &str,
        action: &str,
        allowed: bool,
    ) -> AuthzResult<()> {
        let target = self.target(operation, resource, action)?;
        let subject = self.subject(operation, subject, kind)?;
        debug_assert_eq!(subject.kind(), kind);
        self.write(
            operation,
            GrantMutation::Set {
                subject,
                target,
                allowed,
            },
        )
        .await
    }

    /// Allows `role` to perform `action` on `resource` and its descendants.
    pub async fn authorize_role(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        self.set_grant("authorize_role", role, SubjectKind::Role, resource, action, true)
            .await
    }

    /// Denies `role` `action` on `resource` and its descendants.
    pub async fn deny_role(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        self.set_grant("deny_role", role, SubjectKind::Role, resource, action, false)
            .await
    }

    /// Allows `user` to perform `action` on `resource` and its descendants.
    pub async fn authorize_user(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        self.set_grant("authorize_user", user, SubjectKind::User, resource, action, true)
            .await
    }

    /// Denies `user` `action` on `resource` and its descendants.
    pub async fn deny_user(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        self.set_grant("deny_user", user, SubjectKind::User, resource, action, false)
            .await
    }

    /// Records one grant; the bulk import entry point.
    pub async fn add_authorization(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        allowed: bool,
        is_role: bool,
    ) -> AuthzResult<()> {
        self.set_grant(
            "add_authorization",
            subject,
            SubjectKind::from_is_role(is_role),
            resource,
            action,
            allowed,
        )
        .await
    }

    /// Removes every grant and permission record of `resource`.
    ///
    /// Grants on descendants are kept.
    pub async fn clear_resource_authorizations(&self, resource: &str) -> AuthzResult<()> {
        let resource = self.require_resource("clear_resource_authorizations", resource)?;
        self.write(
            "clear_resource_authorizations",
            GrantMutation::ClearResource { resource },
        )
        .await
    }

    /// Removes every grant of `role`.
    pub async fn clear_role_authorizations(&self, role: &str) -> AuthzResult<()> {
        let subject = self.subject("clear_role_authorizations", role, SubjectKind::Role)?;
        self.write("clear_role_authorizations", GrantMutation::ClearSubject(subject))
            .await
    }

    /// Removes the grant of `role` for `action` on exactly `resource`.
    pub async fn clear_role_authorization(&self, role: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let target = self.target("clear_role_authorization", resource, action)?;
        let subject = self.subject("clear_role_authorization", role, SubjectKind::Role)?;
        self.write(
            "clear_role_authorization",
            GrantMutation::ClearGrant { subject, target },
        )
        .await
    }

    /// Removes the grants of `role` for `action` on every resource.
    pub async fn clear_role_action_on_all_resources(&self, role: &str, action: &str) -> AuthzResult<()> {
        const OPERATION: &str = "clear_role_action_on_all_resources";
        let (_, action) = self.action(OPERATION, action)?;
        let Subject::Role(role) = self.subject(OPERATION, role, SubjectKind::Role)? else {
            return Err(AuthzError::invalid_input(OPERATION, "role name is required"));
        };
        self.write(OPERATION, GrantMutation::ClearRoleAction { role, action })
            .await
    }

    /// Removes every grant of `user`.
    pub async fn clear_user_authorizations(&self, user: &str) -> AuthzResult<()> {
        let subject = self.subject("clear_user_authorizations", user, SubjectKind::User)?;
        self.write("clear_user_authorizations", GrantMutation::ClearSubject(subject))
            .await
    }

    /// Removes the grant of `user` for `action` on exactly `resource`.
    pub async fn clear_user_authorization(&self, user: &str, resource: &str, action: &str) -> AuthzResult<()> {
        let target = self.target("clear_user_authorization", resource, action)?;
        let subject = self.subject("clear_user_authorization", user, SubjectKind::User)?;
        self.write(
            "clear_user_authorization",
            GrantMutation::ClearGrant { subject, target },
        )
        .await
    }

    /// Moves every grant of role `old` onto role `new`.
    pub async fn reset_permission_on_update_role(&self, old: &str, new: &str) -> AuthzResult<()> {
        const OPERATION: &str = "reset_permission_on_update_role";
        let (Subject::Role(old), Subject::Role(new)) = (
            self.subject(OPERATION, old, SubjectKind::Role)?,
            self.subject(OPERATION, new, SubjectKind::Role)?,
        ) else {
            return Err(AuthzError::invalid_input(OPERATION, "role name is required"));
        };
        if old == new {
            return Ok(());
        }
        self.write(OPERATION, GrantMutation::RenameRole { old, new }).await
    }

    /// Strips tenant-domain suffixes (`admin@acme.com` -> `admin`).
    pub fn normalize_roles(&self, roles: &[String]) -> Vec<String> {
        roles
            .iter()
            .map(|role| strip_tenant_domain(role).to_string())
            .collect()
    }
}
