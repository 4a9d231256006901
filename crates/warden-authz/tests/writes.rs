//! Integration tests for clearing grants and renaming roles.

mod common;

use std::sync::Arc;

use common::{manager, manager_with, members, TENANT};
use warden_authz::{AuthzError, ManagerConfig};
use warden_store::{InMemoryStore, StoreError};
use warden_test::StaticRoleResolver;

/// Clearing a resource removes every ruling on it but keeps descendants.
#[tokio::test]
async fn test_clear_resource_authorizations() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.authorize_role("manager", "/a", "write").await.unwrap();
    manager.deny_user("bob", "/a", "read").await.unwrap();
    manager.authorize_role("auditor", "/a/b", "read").await.unwrap();

    manager.clear_resource_authorizations("/a").await.unwrap();

    assert!(!manager.is_role_authorized("manager", "/a/x", "read").await.unwrap());
    assert!(!manager.is_role_authorized("manager", "/a", "write").await.unwrap());
    assert!(manager
        .explicitly_denied_users_for_resource("/a", "read")
        .await
        .unwrap()
        .is_empty());
    assert!(manager.is_role_authorized("auditor", "/a/b", "read").await.unwrap());
    assert_eq!(store.grant_count(TENANT).await, 1);
    assert_eq!(store.permission_count(TENANT).await, 1);
}

/// With cascading deletes the store drops the grants along with the
/// permission records.
#[tokio::test]
async fn test_clear_resource_with_cascade() {
    let store = InMemoryStore::new();
    let config = ManagerConfig {
        cascade_delete_enabled: true,
        ..Default::default()
    };
    let manager = manager_with(store.clone(), config, Arc::new(StaticRoleResolver::new())).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.authorize_user("alice", "/a", "read").await.unwrap();

    manager.clear_resource_authorizations("/a").await.unwrap();

    assert_eq!(store.grant_count(TENANT).await, 0);
    assert_eq!(store.permission_count(TENANT).await, 0);
    assert!(!manager.is_user_authorized("alice", "/a", "read").await.unwrap());
}

/// Without store cascade the grants are deleted explicitly first.
#[tokio::test]
async fn test_clear_resource_without_store_cascade() {
    let store = InMemoryStore::new().without_referential_cascade();
    let manager = manager(store.clone()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();

    manager.clear_resource_authorizations("/a").await.unwrap();

    assert_eq!(store.grant_count(TENANT).await, 0);
    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());
}

/// Relying on a cascade the store does not perform fails and leaves every
/// grant in place.
#[tokio::test]
async fn test_clear_resource_cascade_mismatch_rolls_back() {
    let store = InMemoryStore::new().without_referential_cascade();
    let config = ManagerConfig {
        cascade_delete_enabled: true,
        ..Default::default()
    };
    let manager = manager_with(store.clone(), config, Arc::new(StaticRoleResolver::new())).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();

    let err = manager.clear_resource_authorizations("/a").await.unwrap_err();
    assert!(matches!(
        err,
        AuthzError::Store {
            source: StoreError::Conflict(_),
            ..
        }
    ));
    assert_eq!(err.context().and_then(|c| c.resource.as_deref()), Some("/a"));
    assert_eq!(store.grant_count(TENANT).await, 1);
    assert!(manager.is_role_authorized("manager", "/a", "read").await.unwrap());
}

/// Clearing a role removes all of its rulings and nobody else's.
#[tokio::test]
async fn test_clear_role_authorizations() {
    let manager = manager_with(
        InMemoryStore::new(),
        ManagerConfig::default(),
        members("alice", &["manager"]),
    )
    .await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/b", "write").await.unwrap();
    manager.authorize_role("auditor", "/a", "read").await.unwrap();
    assert!(manager.is_user_authorized("alice", "/a", "read").await.unwrap());

    manager.clear_role_authorizations("Manager").await.unwrap();

    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert!(manager.denied_roles_for_resource("/b", "write").await.unwrap().is_empty());
    assert!(manager.is_role_authorized("auditor", "/a", "read").await.unwrap());
    assert!(!manager.is_user_authorized("alice", "/a", "read").await.unwrap());
}

/// Clearing one role grant touches exactly that resource and action.
#[tokio::test]
async fn test_clear_role_authorization() {
    let manager = manager(InMemoryStore::new()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.authorize_role("manager", "/a", "write").await.unwrap();
    manager.deny_role("manager", "/a/b", "read").await.unwrap();

    manager.clear_role_authorization("manager", "/a", "read").await.unwrap();
    // Clearing something that does not exist is fine.
    manager.clear_role_authorization("manager", "/zzz", "read").await.unwrap();

    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert!(manager.is_role_authorized("manager", "/a", "write").await.unwrap());
    assert_eq!(
        manager.denied_roles_for_resource("/a/b", "read").await.unwrap().len(),
        1
    );
}

/// Clearing a role's action removes it on every resource.
#[tokio::test]
async fn test_clear_role_action_on_all_resources() {
    let manager = manager(InMemoryStore::new()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/b/c", "read").await.unwrap();
    manager.authorize_role("manager", "/a", "write").await.unwrap();
    manager.authorize_role("auditor", "/a", "read").await.unwrap();

    manager
        .clear_role_action_on_all_resources("manager", "READ")
        .await
        .unwrap();

    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert!(manager.denied_roles_for_resource("/b", "read").await.unwrap().is_empty());
    assert!(manager.is_role_authorized("manager", "/a", "write").await.unwrap());
    assert!(manager.is_role_authorized("auditor", "/a", "read").await.unwrap());
}

/// Clearing a user removes all of their rulings.
#[tokio::test]
async fn test_clear_user_authorizations() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;
    manager.authorize_user("alice", "/a", "read").await.unwrap();
    manager.deny_user("alice", "/a/b", "read").await.unwrap();
    manager.authorize_user("bob", "/a", "read").await.unwrap();
    assert!(manager.is_user_authorized("alice", "/a", "read").await.unwrap());

    manager.clear_user_authorizations("Alice").await.unwrap();

    assert!(!manager.is_user_authorized("alice", "/a", "read").await.unwrap());
    assert!(manager.is_user_authorized("bob", "/a/b", "read").await.unwrap());
    assert_eq!(store.grant_count(TENANT).await, 1);
}

/// Clearing one user grant leaves the user's other grants.
#[tokio::test]
async fn test_clear_user_authorization() {
    let manager = manager(InMemoryStore::new()).await;
    manager.authorize_user("alice", "/a", "read").await.unwrap();
    manager.authorize_user("alice", "/a/b", "read").await.unwrap();
    assert!(manager.is_user_authorized("alice", "/a/c", "read").await.unwrap());

    manager.clear_user_authorization("alice", "/a", "read").await.unwrap();

    assert!(!manager.is_user_authorized("alice", "/a/c", "read").await.unwrap());
    assert!(manager.is_user_authorized("alice", "/a/b/c", "read").await.unwrap());
}

/// Renaming a role moves its rulings to the new name.
#[tokio::test]
async fn test_rename_role() {
    let store = InMemoryStore::new();
    let manager = manager_with(
        store.clone(),
        ManagerConfig::default(),
        members("alice", &["supervisor"]),
    )
    .await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();
    manager.deny_role("manager", "/a/b", "read").await.unwrap();
    assert!(!manager.is_user_authorized("alice", "/a", "read").await.unwrap());

    manager
        .reset_permission_on_update_role("manager", "supervisor")
        .await
        .unwrap();

    assert!(!manager.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert!(manager.is_role_authorized("supervisor", "/a", "read").await.unwrap());
    assert!(!manager.is_role_authorized("supervisor", "/a/b", "read").await.unwrap());
    assert!(manager.is_user_authorized("alice", "/a", "read").await.unwrap());
    assert_eq!(store.grant_count(TENANT).await, 2);
}

/// Renaming a role to itself changes nothing.
#[tokio::test]
async fn test_rename_role_to_same_name() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;
    manager.authorize_role("manager", "/a", "read").await.unwrap();

    manager
        .reset_permission_on_update_role("Manager", "manager")
        .await
        .unwrap();

    assert!(manager.is_role_authorized("manager", "/a", "read").await.unwrap());
    assert_eq!(store.grant_count(TENANT).await, 1);
}

/// Role names with a tenant suffix are reduced to the bare role.
#[tokio::test]
async fn test_normalize_roles() {
    let manager = manager(InMemoryStore::new()).await;
    let roles = vec!["admin@acme.com".to_string(), "manager".to_string()];
    assert_eq!(manager.normalize_roles(&roles), vec!["admin", "manager"]);
}

/// Different spellings of one resource id address the same stored record.
#[tokio::test]
async fn test_resource_spellings_share_one_record() {
    let store = InMemoryStore::new();
    let manager = manager(store.clone()).await;

    manager.authorize_role("r", "/a/", "read").await.unwrap();
    manager.authorize_role("r", "/a", "read").await.unwrap();
    assert_eq!(store.grant_count(TENANT).await, 1);
    assert_eq!(store.permission_count(TENANT).await, 1);

    manager.clear_role_authorization("r", "a", "read").await.unwrap();
    assert_eq!(store.grant_count(TENANT).await, 0);
    assert!(!manager.is_role_authorized("r", "/a", "read").await.unwrap());
    manager.populate_permission_tree().await.unwrap();
    assert!(!manager.is_role_authorized("r", "/a/", "read").await.unwrap());

    // A deny written under another spelling replaces the allow.
    manager.authorize_role("s", "/b/", "read").await.unwrap();
    manager.deny_role("s", "/b", "read").await.unwrap();
    assert_eq!(store.grant_count(TENANT).await, 1);
    manager.populate_permission_tree().await.unwrap();
    assert!(!manager.is_role_authorized("s", "/b/c", "read").await.unwrap());
    assert_eq!(
        manager.denied_roles_for_resource("/b//", "read").await.unwrap().len(),
        1
    );
}
