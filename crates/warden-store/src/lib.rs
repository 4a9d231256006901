//! Durable store boundary for Warden.
//!
//! The store is the source of truth for every grant. The authorization
//! engine keeps an in-memory projection of it and talks to it through two
//! traits:
//!
//! - [`PermissionStore`] - opens transactions and serves snapshots and
//!   incremental change feeds per tenant
//! - [`StoreTransaction`] - row-level reads and writes that become visible
//!   atomically on commit
//!
//! [`InMemoryStore`] implements both for tests and single-process use.
//!
//! # Logical schema
//!
//! | Table | Unique per |
//! |---|---|
//! | permission (id, resource, action, tenant) | resource, action, tenant |
//! | role grant (permission, role, allow, tenant, domain) | role, permission, tenant, domain |
//! | user grant (permission, user, allow, tenant) | user, permission, tenant |
//! | domain (tenant, name) | tenant, name |
//!
//! # Example
//!
//! ```rust
//! use warden_core::TenantId;
//! use warden_store::{InMemoryStore, PermissionStore, StoreTransaction};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let mut tx = store.begin(TenantId::SUPER).await.unwrap();
//! let permission = tx.ensure_permission("/apps/billing", "read").await.unwrap();
//! tx.insert_role_grant(permission, "manager", "PRIMARY", true).await.unwrap();
//! tx.commit().await.unwrap();
//!
//! let snapshot = store.snapshot(TenantId::SUPER).await.unwrap();
//! assert_eq!(snapshot.grants.len(), 1);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod model;

use async_trait::async_trait;
use warden_core::TenantId;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, DEFAULT_CHANGE_RETENTION};
pub use model::{
    ChangeFeed, ChangeSet, GrantChange, GrantKey, PermissionId, PersistedGrant, SequencedChange,
    Snapshot,
};

/// A source of truth for permission grants.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Opens a transaction scoped to `tenant`.
    async fn begin(&self, tenant: TenantId) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Returns every grant of `tenant` plus the change-log checkpoint.
    async fn snapshot(&self, tenant: TenantId) -> StoreResult<Snapshot>;

    /// Returns the changes committed for `tenant` at or after `since`.
    async fn changes_since(&self, tenant: TenantId, since: u64) -> StoreResult<ChangeFeed>;

    /// Lists resource ids that have a permission record for `action`.
    async fn resource_ids_for_action(
        &self,
        tenant: TenantId,
        action: &str,
    ) -> StoreResult<Vec<String>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// A unit of work against one tenant.
///
/// Writes become visible to other transactions and to the change feed only
/// after [`commit`](Self::commit). Dropping an open transaction discards it.
/// Every method fails with [`StoreError::TransactionClosed`] once the
/// transaction has been committed or rolled back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Looks up the permission record for a resource/action pair.
    async fn permission_id(
        &mut self,
        resource_id: &str,
        action: &str,
    ) -> StoreResult<Option<PermissionId>>;

    /// Returns the permission record for a resource/action pair, creating it
    /// if needed.
    async fn ensure_permission(&mut self, resource_id: &str, action: &str)
        -> StoreResult<PermissionId>;

    /// Returns the polarity of an existing role grant.
    async fn role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<Option<bool>>;

    /// Inserts a role grant.
    async fn insert_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
        allowed: bool,
    ) -> StoreResult<()>;

    /// Deletes a role grant. Returns true if a row was removed.
    async fn delete_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<bool>;

    /// Returns the polarity of an existing user grant.
    async fn user_grant(&mut self, permission: PermissionId, user: &str)
        -> StoreResult<Option<bool>>;

    /// Inserts a user grant.
    async fn insert_user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
        allowed: bool,
    ) -> StoreResult<()>;

    /// Deletes a user grant. Returns true if a row was removed.
    async fn delete_user_grant(&mut self, permission: PermissionId, user: &str)
        -> StoreResult<bool>;

    /// Deletes every role and user grant on `resource_id`, for all actions.
    async fn delete_grants_for_resource(&mut self, resource_id: &str) -> StoreResult<usize>;

    /// Deletes every permission record on `resource_id`.
    ///
    /// Backends with referential cascade drop the dependent grants too;
    /// others fail with [`StoreError::Conflict`] while grants remain.
    async fn delete_permissions_for_resource(&mut self, resource_id: &str) -> StoreResult<usize>;

    /// Deletes every grant of a role.
    async fn delete_role_grants(&mut self, role: &str, domain: &str) -> StoreResult<usize>;

    /// Deletes every grant of a role for one action, on all resources.
    async fn delete_role_grants_for_action(
        &mut self,
        role: &str,
        domain: &str,
        action: &str,
    ) -> StoreResult<usize>;

    /// Deletes every grant of a user.
    async fn delete_user_grants(&mut self, user: &str) -> StoreResult<usize>;

    /// Moves every grant of `old` in `domain` onto `new`.
    async fn rename_role(&mut self, old: &str, new: &str, domain: &str) -> StoreResult<usize>;

    /// Returns true if `role` is a built-in system role.
    async fn is_system_role(&mut self, role: &str) -> StoreResult<bool>;

    /// Makes the transaction's writes durable and visible.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Discards the transaction's writes.
    async fn rollback(&mut self) -> StoreResult<()>;
}
