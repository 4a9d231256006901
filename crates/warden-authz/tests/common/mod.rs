//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use warden_authz::{AuthorizationManager, ManagerConfig, RoleResolver};
use warden_core::TenantId;
use warden_store::PermissionStore;
use warden_test::StaticRoleResolver;

/// Tenant every helper builds managers for.
pub const TENANT: TenantId = TenantId::SUPER;

/// Builds a manager with the default configuration and no role members.
pub async fn manager(store: impl PermissionStore + 'static) -> AuthorizationManager {
    manager_with(store, ManagerConfig::default(), Arc::new(StaticRoleResolver::new())).await
}

/// Builds a manager with an explicit configuration and resolver.
pub async fn manager_with(
    store: impl PermissionStore + 'static,
    config: ManagerConfig,
    resolver: Arc<dyn RoleResolver>,
) -> AuthorizationManager {
    AuthorizationManager::builder(Arc::new(store))
        .config(config)
        .resolver(resolver)
        .build()
        .await
        .unwrap()
}

/// Resolver where `user` holds `roles`.
pub fn members(user: &str, roles: &[&str]) -> Arc<StaticRoleResolver> {
    Arc::new(StaticRoleResolver::new().with_roles(user, roles))
}
