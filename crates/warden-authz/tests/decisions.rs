//! Integration tests for authorization decisions.
//!
//! Covers inheritance down the resource hierarchy, overrides, role
//! membership, direct user rulings and name handling.

mod common;

use std::sync::Arc;

use common::{manager, manager_with, members, TENANT};
use warden_authz::ManagerConfig;
use warden_store::InMemoryStore;
use warden_test::StaticRoleResolver;

/// Nothing granted means nothing allowed.
#[tokio::test]
async fn test_default_deny() {
    let manager = manager(InMemoryStore::new()).await;

    assert!(!manager
        .is_role_authorized("manager", "/apps/billing", "read")
        .await
        .unwrap());
    assert!(!manager
        .is_user_authorized("alice", "/apps/billing", "read")
        .await
        .unwrap());
}

/// An allow covers the resource and its descendants, not its ancestors,
/// siblings or other actions.
#[tokio::test]
async fn test_allow_is_inherited_downwards() {
    let manager = manager(InMemoryStore::new()).await;
    manager
        .authorize_role("manager", "/apps/billing", "read")
        .await
        .unwrap();

    for resource in ["/apps/billing", "/apps/billing/reports", "/apps/billing/reports/q1"] {
        assert!(
            manager.is_role_authorized("manager", resource, "read").await.unwrap(),
            "{resource} should inherit the allow"
        );
    }
    assert!(!manager.is_role_authorized("manager", "/apps", "read").await.unwrap());
    assert!(!manager.is_role_authorized("manager", "/apps/crm", "read").await.unwrap());
    assert!(!manager
        .is_role_authorized("manager", "/apps/billing", "write")
        .await
        .unwrap());
    assert!(!manager
        .is_role_authorized("auditor", "/apps/billing", "read")
        .await
        .unwrap());
}

/// The ruling closest to the resource wins.
#[tokio::test]
async fn test_most_specific_ruling_wins() {
    let manager = manager(InMemoryStore::new()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/a/b", "read").await.unwrap();
    manager.authorize_role("manager", "/a/b/c", "read").await.unwrap();

    let expected = [
        ("/a", true),
        ("/a/x", true),
        ("/a/b", false),
        ("/a/b/y", false),
        ("/a/b/c", true),
        ("/a/b/c/z", true),
    ];
    for (resource, allowed) in expected {
        assert_eq!(
            manager.is_role_authorized("manager", resource, "read").await.unwrap(),
            allowed,
            "{resource}"
        );
    }
}

/// Denying replaces an allow for the same key and vice versa; the store
/// never holds both.
#[tokio::test]
async fn test_polarity_is_exclusive() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;

    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/a", "read").await.unwrap();
    assert_eq!(store.grant_count(TENANT).await, 1);
    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());

    manager.authorize_role("manager", "/a", "read").await.unwrap();
    assert_eq!(store.grant_count(TENANT).await, 1);
    assert!(manager.is_role_authorized("manager", "/a", "read").await.unwrap());
}

/// Granting the same thing twice stores it once.
#[tokio::test]
async fn test_repeated_grant_is_idempotent() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;

    manager.authorize_user("alice", "/a", "read").await.unwrap();
    manager.authorize_user("ALICE", "/a", "read").await.unwrap();
    manager.add_authorization("alice", "/a", "read", true, false).await.unwrap();

    assert_eq!(store.grant_count(TENANT).await, 1);
    assert_eq!(store.permission_count(TENANT).await, 1);
    assert!(manager.is_user_authorized("alice", "/a/b", "read").await.unwrap());
}

/// Users are authorized through the roles they hold.
#[tokio::test]
async fn test_user_inherits_role_rulings() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("alice", &["manager"]),
    )
    .await;
    manager
        .authorize_role("manager", "/apps/billing", "read")
        .await
        .unwrap();

    assert!(manager
        .is_user_authorized("alice", "/apps/billing/reports", "read")
        .await
        .unwrap());
    assert!(!manager
        .is_user_authorized("bob", "/apps/billing/reports", "read")
        .await
        .unwrap());
}

/// A role denied below its allow no longer authorizes its members there.
#[tokio::test]
async fn test_role_override_applies_to_members() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("alice", &["manager"]),
    )
    .await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/a/b", "read").await.unwrap();

    assert!(manager.is_user_authorized("alice", "/a/c", "read").await.unwrap());
    assert!(!manager.is_user_authorized("alice", "/a/b/c", "read").await.unwrap());
}

/// Direct user rulings follow the same inheritance as role rulings.
#[tokio::test]
async fn test_direct_user_rulings() {
    let manager = manager(InMemoryStore::new()).await;
    manager.deny_user("alice", "/a", "read").await.unwrap();
    manager.authorize_user("alice", "/a/b", "read").await.unwrap();

    assert!(!manager.is_user_authorized("alice", "/a/x", "read").await.unwrap());
    assert!(manager.is_user_authorized("alice", "/a/b/c", "read").await.unwrap());
    assert!(!manager.is_user_authorized("bob", "/a/b/c", "read").await.unwrap());
}

/// A direct deny on the user does not cancel an allow held through a role.
#[tokio::test]
async fn test_user_deny_does_not_block_role_allow() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("alice", &["manager"]),
    )
    .await;
    manager.deny_user("alice", "/a", "read").await.unwrap();
    manager.authorize_role("manager", "/a", "read").await.unwrap();

    assert!(manager.is_user_authorized("alice", "/a", "read").await.unwrap());
}

/// The system user is authorized for everything, under any casing.
#[tokio::test]
async fn test_system_user_bypasses_checks() {
    let manager = manager(InMemoryStore::new()).await;
    manager.deny_user("warden.system.user", "/", "read").await.unwrap();

    assert!(manager
        .is_user_authorized("warden.system.user", "/anything", "read")
        .await
        .unwrap());
    assert!(manager
        .is_user_authorized("Warden.System.User", "/anything/else", "delete")
        .await
        .unwrap());
}

/// Names, resources and actions are case-insensitive by default.
#[tokio::test]
async fn test_names_are_case_insensitive_by_default() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("Alice", &["Manager"]),
    )
    .await;
    manager
        .authorize_role("Manager", "/Apps/Billing", "READ")
        .await
        .unwrap();

    assert!(manager
        .is_role_authorized("manager", "/apps/billing/reports", "read")
        .await
        .unwrap());
    assert!(manager
        .is_user_authorized("ALICE", "/APPS/BILLING", "Read")
        .await
        .unwrap());
}

/// Case-sensitive deployments keep names as given.
#[tokio::test]
async fn test_case_sensitive_names() {
    let config = ManagerConfig {
        case_sensitive: true,
        ..Default::default()
    };
    let manager = manager_with(InMemoryStore::new(), config, Arc::new(StaticRoleResolver::new())).await;
    manager.authorize_user("Alice", "/Apps", "read").await.unwrap();

    assert!(manager.is_user_authorized("Alice", "/Apps/x", "read").await.unwrap());
    assert!(!manager.is_user_authorized("alice", "/Apps/x", "read").await.unwrap());
    assert!(!manager.is_user_authorized("Alice", "/apps/x", "read").await.unwrap());
}

/// Roles in internal domains match members regardless of domain casing.
#[tokio::test]
async fn test_internal_domain_roles() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("alice", &["Internal/everyone"]),
    )
    .await;
    manager
        .authorize_role("internal/Everyone", "/home", "read")
        .await
        .unwrap();

    assert!(manager
        .is_role_authorized("Internal/everyone", "/home/docs", "read")
        .await
        .unwrap());
    assert!(manager.is_user_authorized("alice", "/home/docs", "read").await.unwrap());
    assert!(!manager.is_role_authorized("everyone", "/home", "read").await.unwrap());
}

/// Roles qualified with a registered user-store domain are kept apart from
/// the primary role of the same name.
#[tokio::test]
async fn test_secondary_domain_roles() {
    let store = InMemoryStore::new();
    store.register_domain(TENANT, "LDAP").await;
    let manager = manager(store).await;
    manager.authorize_role("ldap/staff", "/intranet", "read").await.unwrap();

    assert!(manager
        .is_role_authorized("LDAP/Staff", "/intranet", "read")
        .await
        .unwrap());
    assert!(!manager.is_role_authorized("staff", "/intranet", "read").await.unwrap());
}

/// A failing membership lookup counts as holding no roles.
#[tokio::test]
async fn test_membership_failure_denies() {
    let resolver = members("alice", &["manager"]);
    let manager = manager_with(InMemoryStore::new(), ManagerConfig::default(), resolver.clone()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();

    resolver.set_failing(true);
    assert!(!manager.is_user_authorized("alice", "/a", "read").await.unwrap());

    resolver.set_failing(false);
    assert!(manager.is_user_authorized("alice", "/a/b", "read").await.unwrap());
}

/// Listing every role of the user gives the same decisions as per-role
/// membership checks.
#[tokio::test]
async fn test_verify_by_listing_user_roles() {
    let config = ManagerConfig {
        verify_by_retrieving_all_user_roles: true,
        ..Default::default()
    };
    let resolver = members("alice", &["Manager", "auditor"]);
    let manager = manager_with(InMemoryStore::new(), config, resolver.clone()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/a/b", "read").await.unwrap();

    assert!(manager.is_user_authorized("alice", "/a/c", "read").await.unwrap());
    assert!(!manager.is_user_authorized("alice", "/a/b", "read").await.unwrap());
    assert!(!manager.is_user_authorized("bob", "/a/c", "read").await.unwrap());
    assert!(resolver.lookups() > 0);
}

/// Membership is not consulted when no role could authorize the request.
#[tokio::test]
async fn test_membership_skipped_without_candidate_roles() {
    let resolver = members("alice", &["manager"]);
    let manager = manager_with(InMemoryStore::new(), ManagerConfig::default(), resolver.clone()).await;
    manager.authorize_user("alice", "/a", "read").await.unwrap();

    assert!(manager.is_user_authorized("alice", "/a", "read").await.unwrap());
    assert!(!manager.is_user_authorized("alice", "/b", "read").await.unwrap());
    assert_eq!(resolver.lookups(), 0);
}

/// Extra actions from the configuration are usable like built-in ones.
#[tokio::test]
async fn test_configured_actions() {
    let config = ManagerConfig {
        extra_actions: vec!["approve".to_string()],
        ..Default::default()
    };
    let manager = manager_with(InMemoryStore::new(), config, Arc::new(StaticRoleResolver::new())).await;
    manager.authorize_role("manager", "/invoices", "approve").await.unwrap();

    assert!(manager
        .is_role_authorized("manager", "/invoices/42", "Approve")
        .await
        .unwrap());
    assert!(!manager
        .is_role_authorized("manager", "/invoices/42", "read")
        .await
        .unwrap());
}

/// Tenants sharing one store do not see each other's grants.
#[tokio::test]
async fn test_tenants_are_isolated() {
    let store = InMemoryStore::new();
    let acme = manager_with(
        store.clone(),
        ManagerConfig {
            tenant: warden_core::TenantId::new(1),
            ..Default::default()
        },
        Arc::new(StaticRoleResolver::new()),
    )
    .await;
    let globex = manager_with(
        store,
        ManagerConfig {
            tenant: warden_core::TenantId::new(2),
            ..Default::default()
        },
        Arc::new(StaticRoleResolver::new()),
    )
    .await;

    acme.authorize_role("manager", "/a", "read").await.unwrap();
    assert!(acme.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert!(!globex.is_role_authorized("manager", "/a", "read").await.unwrap());
}

/// A department setup with role and user rulings mixed.
#[tokio::test]
async fn test_billing_department() {
    let resolver = Arc::new(
        StaticRoleResolver::new()
            .with_roles("alice", &["billing-manager"])
            .with_roles("bob", &["billing-clerk"])
            .with_roles("carol", &["billing-clerk"]),
    );
    let manager = manager_with(InMemoryStore::new(), ManagerConfig::default(), resolver).await;

    manager.authorize_role("billing-manager", "/apps/billing", "read").await.unwrap();
    manager.authorize_role("billing-manager", "/apps/billing", "write").await.unwrap();
    manager.authorize_role("billing-clerk", "/apps/billing/invoices", "read").await.unwrap();
    manager.deny_role("billing-clerk", "/apps/billing/invoices/archive", "read").await.unwrap();
    manager.authorize_user("carol", "/apps/billing/invoices/archive", "read").await.unwrap();

    let checks = [
        ("alice", "/apps/billing/invoices/archive", "write", true),
        ("alice", "/apps/crm", "read", false),
        ("bob", "/apps/billing/invoices/2024", "read", true),
        ("bob", "/apps/billing/invoices/2024", "write", false),
        ("bob", "/apps/billing/invoices/archive/2019", "read", false),
        ("carol", "/apps/billing/invoices/archive/2019", "read", true),
        ("dave", "/apps/billing", "read", false),
    ];
    for (user, resource, action, allowed) in checks {
        assert_eq!(
            manager.is_user_authorized(user, resource, action).await.unwrap(),
            allowed,
            "{user} {action} {resource}"
        );
    }
}
