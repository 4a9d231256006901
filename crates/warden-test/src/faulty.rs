//! Fault-injecting store wrapper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use warden_core::TenantId;
use warden_store::{
    ChangeFeed, InMemoryStore, PermissionId, PermissionStore, Snapshot, StoreError, StoreResult,
    StoreTransaction,
};

/// Where a [`FaultyStore`] can inject a failure or a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Opening a transaction.
    Begin,
    /// Reading a full snapshot.
    Snapshot,
    /// Reading the change feed.
    ChangesSince,
    /// Listing resource ids for an action.
    ResourceIds,
    /// Any read or write inside a transaction.
    Operation,
    /// Committing a transaction.
    Commit,
    /// Rolling back a transaction.
    Rollback,
}

#[derive(Debug, Default)]
struct Faults {
    failures: Mutex<HashMap<FaultPoint, StoreError>>,
    delays: Mutex<HashMap<FaultPoint, Duration>>,
    calls: Mutex<HashMap<FaultPoint, usize>>,
}

impl Faults {
    async fn check(&self, point: FaultPoint) -> StoreResult<()> {
        *self.calls.lock().entry(point).or_default() += 1;
        let delay = self.delays.lock().get(&point).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().get(&point).cloned();
        failure.map_or(Ok(()), Err)
    }
}

/// An [`InMemoryStore`] that fails or stalls on demand.
///
/// Faults stay armed until [`heal`](Self::heal)ed. Clones share the faults
/// and the underlying store.
///
/// ```
/// use warden_core::TenantId;
/// use warden_store::{InMemoryStore, PermissionStore, StoreError};
/// use warden_test::{FaultPoint, FaultyStore};
///
/// # tokio_test::block_on(async {
/// let store = FaultyStore::new(InMemoryStore::new());
/// store.fail(FaultPoint::Snapshot, StoreError::unavailable("db down"));
/// assert!(store.snapshot(TenantId::SUPER).await.is_err());
///
/// store.heal(FaultPoint::Snapshot);
/// assert!(store.snapshot(TenantId::SUPER).await.is_ok());
/// assert_eq!(store.calls(FaultPoint::Snapshot), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: InMemoryStore,
    faults: Arc<Faults>,
}

impl FaultyStore {
    /// Wraps `inner`.
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    /// The wrapped store, bypassing every fault.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Makes every call at `point` fail with `error`.
    pub fn fail(&self, point: FaultPoint, error: StoreError) {
        self.faults.failures.lock().insert(point, error);
    }

    /// Delays every call at `point` by `delay`.
    pub fn delay(&self, point: FaultPoint, delay: Duration) {
        self.faults.delays.lock().insert(point, delay);
    }

    /// Removes the failure and delay armed at `point`.
    pub fn heal(&self, point: FaultPoint) {
        self.faults.failures.lock().remove(&point);
        self.faults.delays.lock().remove(&point);
    }

    /// Removes every armed fault.
    pub fn heal_all(&self) {
        self.faults.failures.lock().clear();
        self.faults.delays.lock().clear();
    }

    /// Number of calls that reached `point`, faulted or not.
    pub fn calls(&self, point: FaultPoint) -> usize {
        self.faults.calls.lock().get(&point).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PermissionStore for FaultyStore {
    async fn begin(&self, tenant: TenantId) -> StoreResult<Box<dyn StoreTransaction>> {
        self.faults.check(FaultPoint::Begin).await?;
        let inner = self.inner.begin(tenant).await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn snapshot(&self, tenant: TenantId) -> StoreResult<Snapshot> {
        self.faults.check(FaultPoint::Snapshot).await?;
        self.inner.snapshot(tenant).await
    }

    async fn changes_since(&self, tenant: TenantId, since: u64) -> StoreResult<ChangeFeed> {
        self.faults.check(FaultPoint::ChangesSince).await?;
        self.inner.changes_since(tenant, since).await
    }

    async fn resource_ids_for_action(
        &self,
        tenant: TenantId,
        action: &str,
    ) -> StoreResult<Vec<String>> {
        self.faults.check(FaultPoint::ResourceIds).await?;
        self.inner.resource_ids_for_action(tenant, action).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}

/// Transaction whose calls pass through the store's faults.
///
/// A failed commit or rollback leaves the inner transaction open; dropping
/// it discards its writes.
struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    faults: Arc<Faults>,
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn permission_id(
        &mut self,
        resource_id: &str,
        action: &str,
    ) -> StoreResult<Option<PermissionId>> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.permission_id(resource_id, action).await
    }

    async fn ensure_permission(
        &mut self,
        resource_id: &str,
        action: &str,
    ) -> StoreResult<PermissionId> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.ensure_permission(resource_id, action).await
    }

    async fn role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<Option<bool>> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.role_grant(permission, role, domain).await
    }

    async fn insert_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
        allowed: bool,
    ) -> StoreResult<()> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner
            .insert_role_grant(permission, role, domain, allowed)
            .await
    }

    async fn delete_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<bool> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_role_grant(permission, role, domain).await
    }

    async fn user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
    ) -> StoreResult<Option<bool>> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.user_grant(permission, user).await
    }

    async fn insert_user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
        allowed: bool,
    ) -> StoreResult<()> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.insert_user_grant(permission, user, allowed).await
    }

    async fn delete_user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
    ) -> StoreResult<bool> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_user_grant(permission, user).await
    }

    async fn delete_grants_for_resource(&mut self, resource_id: &str) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_grants_for_resource(resource_id).await
    }

    async fn delete_permissions_for_resource(&mut self, resource_id: &str) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_permissions_for_resource(resource_id).await
    }

    async fn delete_role_grants(&mut self, role: &str, domain: &str) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_role_grants(role, domain).await
    }

    async fn delete_role_grants_for_action(
        &mut self,
        role: &str,
        domain: &str,
        action: &str,
    ) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner
            .delete_role_grants_for_action(role, domain, action)
            .await
    }

    async fn delete_user_grants(&mut self, user: &str) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.delete_user_grants(user).await
    }

    async fn rename_role(&mut self, old: &str, new: &str, domain: &str) -> StoreResult<usize> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.rename_role(old, new, domain).await
    }

    async fn is_system_role(&mut self, role: &str) -> StoreResult<bool> {
        self.faults.check(FaultPoint::Operation).await?;
        self.inner.is_system_role(role).await
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.faults.check(FaultPoint::Commit).await?;
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.faults.check(FaultPoint::Rollback).await?;
        self.inner.rollback().await
    }
}
