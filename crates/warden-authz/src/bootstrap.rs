//! Startup grants.
//!
//! When a manager is built, the configured UI resources are granted
//! `ui.execute` to the everyone role and to the admin role. A resource the
//! role can already execute, directly or through an ancestor, is skipped, so
//! bootstrapping every start is safe.

use tracing::{debug, info};
use warden_core::domain::{add_domain, extract_domain, remove_domain, INTERNAL_DOMAIN, SEPARATOR};
use warden_core::SubjectKind;
use warden_tree::UI_EXECUTE;

use crate::config::BootstrapSettings;
use crate::engine::AuthorizationEngine;
use crate::error::AuthzResult;
use crate::membership::UserStoreInfo;

/// Resolves the name the admin role is granted under.
///
/// An explicit domain prefix is kept. A read-only user store that does not
/// expose its groups cannot hold the role, so it lives in the internal
/// domain. Otherwise the role is qualified with the user store's domain.
/// Settings override what the resolver reports.
pub(crate) fn admin_role_name(settings: &BootstrapSettings, store: &UserStoreInfo) -> String {
    let admin = settings.admin_role.trim();
    if extract_domain(admin).is_some() {
        return admin.to_string();
    }

    let read_groups = settings.read_groups.or(store.read_groups).unwrap_or(false);
    if store.read_only && !read_groups {
        return format!("{INTERNAL_DOMAIN}{SEPARATOR}{}", remove_domain(admin));
    }

    let domain = settings
        .user_store_domain
        .as_deref()
        .or(store.domain.as_deref());
    add_domain(admin, domain)
}

async fn grant_unless_allowed(engine: &AuthorizationEngine, role: &str, resource: &str) -> AuthzResult<()> {
    let target = engine.target("bootstrap", resource, UI_EXECUTE)?;
    if engine.role_decision(role, &target).await? {
        debug!(role, resource = %target.resource, "startup grant already in effect");
        return Ok(());
    }
    engine
        .set_grant("bootstrap", role, SubjectKind::Role, resource, UI_EXECUTE, true)
        .await
}

/// Writes the configured startup grants through `engine`.
pub(crate) async fn run(engine: &AuthorizationEngine) -> AuthzResult<()> {
    let settings = &engine.config().bootstrap;

    for resource in &settings.everyone_resources {
        grant_unless_allowed(engine, &settings.everyone_role, resource).await?;
    }

    if !settings.admin_resources.is_empty() {
        let admin = admin_role_name(settings, &engine.resolver().user_store());
        for resource in &settings.admin_resources {
            grant_unless_allowed(engine, &admin, resource).await?;
        }
        info!(
            tenant = %engine.tenant_id(),
            admin_role = %admin,
            everyone = settings.everyone_resources.len(),
            admin = settings.admin_resources.len(),
            "bootstrapped UI permissions"
        );
    } else if !settings.everyone_resources.is_empty() {
        info!(
            tenant = %engine.tenant_id(),
            everyone = settings.everyone_resources.len(),
            "bootstrapped UI permissions"
        );
    }
    Ok(())
}
