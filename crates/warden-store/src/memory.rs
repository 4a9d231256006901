//! In-memory permission store.
//!
//! All tenants share one `tokio::sync::Mutex`. A transaction holds the lock
//! from `begin` until `commit` or `rollback`, works on a private copy of the
//! tenant's tables, and swaps the copy in on commit. Transactions on the
//! same store are therefore serialized and a delete-then-insert pair inside
//! one transaction is never observed half done.
//!
//! Each tenant keeps a bounded change log of committed row-level changes.
//! Consumers that fall behind the retained window get
//! [`ChangeFeed::Expired`] and must reload a snapshot.
//!
//! State is lost when the process exits.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use warden_core::domain::{APPLICATION_DOMAIN, INTERNAL_DOMAIN, PRIMARY_DOMAIN, SYSTEM_DOMAIN};
use warden_core::{SubjectKind, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::model::{
    ChangeFeed, ChangeSet, GrantChange, GrantKey, PermissionId, PersistedGrant, SequencedChange,
    Snapshot,
};
use crate::{PermissionStore, StoreTransaction};

/// Default number of changes retained per tenant.
pub const DEFAULT_CHANGE_RETENTION: usize = 10_000;

/// Bounded log of committed changes for one tenant.
#[derive(Debug)]
struct ChangeLog {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<SequencedChange>,
}

impl ChangeLog {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::new(),
        }
    }

    fn record(&mut self, change: GrantChange) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(SequencedChange { seq, change });
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// First sequence number still retained.
    fn oldest(&self) -> u64 {
        self.next_seq - self.items.len() as u64
    }

    fn since(&self, since: u64) -> ChangeFeed {
        if since < self.oldest() || since > self.next_seq {
            return ChangeFeed::Expired;
        }
        let changes = self
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .cloned()
            .collect();
        ChangeFeed::Changes(ChangeSet {
            changes,
            next_seq: self.next_seq,
        })
    }
}

#[derive(Debug, Clone)]
struct PermissionRow {
    resource_id: String,
    action: String,
}

/// (permission, role, domain)
type RoleGrantKey = (PermissionId, String, String);

/// (permission, user)
type UserGrantKey = (PermissionId, String);

#[derive(Debug, Clone)]
struct Tables {
    permissions: BTreeMap<PermissionId, PermissionRow>,
    role_grants: BTreeMap<RoleGrantKey, bool>,
    user_grants: BTreeMap<UserGrantKey, bool>,
    domains: BTreeSet<String>,
    system_roles: BTreeSet<String>,
}

impl Tables {
    fn seeded() -> Self {
        Self {
            permissions: BTreeMap::new(),
            role_grants: BTreeMap::new(),
            user_grants: BTreeMap::new(),
            domains: [PRIMARY_DOMAIN, SYSTEM_DOMAIN, INTERNAL_DOMAIN, APPLICATION_DOMAIN]
                .into_iter()
                .map(str::to_string)
                .collect(),
            system_roles: BTreeSet::new(),
        }
    }

    fn role_key(&self, (permission, role, domain): &RoleGrantKey) -> Option<GrantKey> {
        let row = self.permissions.get(permission)?;
        Some(GrantKey {
            kind: SubjectKind::Role,
            subject: role.clone(),
            domain: Some(domain.clone()),
            resource_id: row.resource_id.clone(),
            action: row.action.clone(),
        })
    }

    fn user_key(&self, (permission, user): &UserGrantKey) -> Option<GrantKey> {
        let row = self.permissions.get(permission)?;
        Some(GrantKey {
            kind: SubjectKind::User,
            subject: user.clone(),
            domain: None,
            resource_id: row.resource_id.clone(),
            action: row.action.clone(),
        })
    }

    fn grants(&self, tenant: TenantId) -> Vec<PersistedGrant> {
        let roles = self.role_grants.iter().filter_map(|(key, allowed)| {
            self.role_key(key).map(|key| PersistedGrant {
                key,
                tenant,
                allowed: *allowed,
            })
        });
        let users = self.user_grants.iter().filter_map(|(key, allowed)| {
            self.user_key(key).map(|key| PersistedGrant {
                key,
                tenant,
                allowed: *allowed,
            })
        });
        roles.chain(users).collect()
    }

    fn permission_ids_for(&self, resource_id: &str) -> BTreeSet<PermissionId> {
        self.permissions
            .iter()
            .filter(|(_, row)| row.resource_id == resource_id)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug)]
struct TenantState {
    tables: Tables,
    log: ChangeLog,
}

#[derive(Debug)]
struct StoreState {
    tenants: HashMap<TenantId, TenantState>,
    next_permission_id: u64,
    retention: usize,
    referential_cascade: bool,
}

impl StoreState {
    fn tenant(&mut self, tenant: TenantId) -> &mut TenantState {
        let retention = self.retention;
        self.tenants.entry(tenant).or_insert_with(|| TenantState {
            tables: Tables::seeded(),
            log: ChangeLog::new(retention),
        })
    }
}

/// Transactional, change-logged permission store kept in memory.
///
/// Cloning yields another handle to the same state, which is how several
/// authorization managers share one store in tests.
///
/// Every tenant starts with the `PRIMARY`, `SYSTEM`, `INTERNAL` and
/// `APPLICATION` domains; other domains must be registered with
/// [`register_domain`](Self::register_domain) before role grants can name
/// them.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with the default change retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_CHANGE_RETENTION)
    }

    /// Creates an empty store retaining at most `retention` changes per tenant.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                tenants: HashMap::new(),
                next_permission_id: 1,
                retention,
                referential_cascade: true,
            })),
        }
    }

    /// Disables referential cascade: deleting a permission record that
    /// grants still reference fails with [`StoreError::Conflict`].
    pub fn without_referential_cascade(self) -> Self {
        if let Ok(mut state) = self.state.try_lock() {
            state.referential_cascade = false;
        }
        self
    }

    /// Registers an identity domain for `tenant`.
    pub async fn register_domain(&self, tenant: TenantId, domain: &str) {
        let mut state = self.state.lock().await;
        state
            .tenant(tenant)
            .tables
            .domains
            .insert(domain.to_uppercase());
    }

    /// Marks `role` as a built-in system role of `tenant`.
    pub async fn add_system_role(&self, tenant: TenantId, role: &str) {
        let mut state = self.state.lock().await;
        state
            .tenant(tenant)
            .tables
            .system_roles
            .insert(role.to_string());
    }

    /// Number of committed grants of `tenant`.
    pub async fn grant_count(&self, tenant: TenantId) -> usize {
        let mut state = self.state.lock().await;
        let tables = &state.tenant(tenant).tables;
        tables.role_grants.len() + tables.user_grants.len()
    }

    /// Number of permission records of `tenant`.
    pub async fn permission_count(&self, tenant: TenantId) -> usize {
        let mut state = self.state.lock().await;
        state.tenant(tenant).tables.permissions.len()
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn begin(&self, tenant: TenantId) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut guard = Arc::clone(&self.state).lock_owned().await;
        let tables = guard.tenant(tenant).tables.clone();
        let next_permission_id = guard.next_permission_id;
        let referential_cascade = guard.referential_cascade;
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            tenant,
            tables,
            next_permission_id,
            referential_cascade,
            changes: Vec::new(),
        }))
    }

    async fn snapshot(&self, tenant: TenantId) -> StoreResult<Snapshot> {
        let mut state = self.state.lock().await;
        let tenant_state = state.tenant(tenant);
        Ok(Snapshot {
            grants: tenant_state.tables.grants(tenant),
            next_seq: tenant_state.log.next_seq,
        })
    }

    async fn changes_since(&self, tenant: TenantId, since: u64) -> StoreResult<ChangeFeed> {
        let mut state = self.state.lock().await;
        Ok(state.tenant(tenant).log.since(since))
    }

    async fn resource_ids_for_action(
        &self,
        tenant: TenantId,
        action: &str,
    ) -> StoreResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let ids: BTreeSet<String> = state
            .tenant(tenant)
            .tables
            .permissions
            .values()
            .filter(|row| row.action == action)
            .map(|row| row.resource_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Open transaction against an [`InMemoryStore`].
struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<StoreState>>,
    tenant: TenantId,
    tables: Tables,
    next_permission_id: u64,
    referential_cascade: bool,
    changes: Vec<GrantChange>,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.guard.is_some() {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }

    fn ensure_domain(&self, domain: &str) -> StoreResult<()> {
        if self.tables.domains.contains(domain) {
            Ok(())
        } else {
            Err(StoreError::UnknownDomain {
                domain: domain.to_string(),
                tenant: self.tenant.get(),
            })
        }
    }

    fn remove_role_rows<F>(&mut self, mut matches: F) -> usize
    where
        F: FnMut(&RoleGrantKey, &PermissionRow) -> bool,
    {
        let doomed: Vec<RoleGrantKey> = self
            .tables
            .role_grants
            .keys()
            .filter(|key| {
                self.tables
                    .permissions
                    .get(&key.0)
                    .is_some_and(|row| matches(key, row))
            })
            .cloned()
            .collect();
        for key in &doomed {
            if let Some(grant_key) = self.tables.role_key(key) {
                self.changes.push(GrantChange::Remove(grant_key));
            }
            self.tables.role_grants.remove(key);
        }
        doomed.len()
    }

    fn remove_user_rows<F>(&mut self, mut matches: F) -> usize
    where
        F: FnMut(&UserGrantKey, &PermissionRow) -> bool,
    {
        let doomed: Vec<UserGrantKey> = self
            .tables
            .user_grants
            .keys()
            .filter(|key| {
                self.tables
                    .permissions
                    .get(&key.0)
                    .is_some_and(|row| matches(key, row))
            })
            .cloned()
            .collect();
        for key in &doomed {
            if let Some(grant_key) = self.tables.user_key(key) {
                self.changes.push(GrantChange::Remove(grant_key));
            }
            self.tables.user_grants.remove(key);
        }
        doomed.len()
    }

    fn upsert_change(&self, key: Option<GrantKey>, allowed: bool) -> Option<GrantChange> {
        key.map(|key| {
            GrantChange::Upsert(PersistedGrant {
                key,
                tenant: self.tenant,
                allowed,
            })
        })
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn permission_id(
        &mut self,
        resource_id: &str,
        action: &str,
    ) -> StoreResult<Option<PermissionId>> {
        self.ensure_open()?;
        Ok(self
            .tables
            .permissions
            .iter()
            .find(|(_, row)| row.resource_id == resource_id && row.action == action)
            .map(|(id, _)| *id))
    }

    async fn ensure_permission(
        &mut self,
        resource_id: &str,
        action: &str,
    ) -> StoreResult<PermissionId> {
        if let Some(id) = self.permission_id(resource_id, action).await? {
            return Ok(id);
        }
        let id = PermissionId::new(self.next_permission_id);
        self.next_permission_id += 1;
        self.tables.permissions.insert(
            id,
            PermissionRow {
                resource_id: resource_id.to_string(),
                action: action.to_string(),
            },
        );
        Ok(id)
    }

    async fn role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<Option<bool>> {
        self.ensure_open()?;
        let key = (permission, role.to_string(), domain.to_string());
        Ok(self.tables.role_grants.get(&key).copied())
    }

    async fn insert_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
        allowed: bool,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        self.ensure_domain(domain)?;
        if !self.tables.permissions.contains_key(&permission) {
            return Err(StoreError::conflict(format!(
                "permission {permission} does not exist"
            )));
        }
        let key = (permission, role.to_string(), domain.to_string());
        if self.tables.role_grants.contains_key(&key) {
            return Err(StoreError::conflict(format!(
                "role grant already exists for '{role}' on permission {permission}"
            )));
        }
        let change = self.upsert_change(self.tables.role_key(&key), allowed);
        self.tables.role_grants.insert(key, allowed);
        self.changes.extend(change);
        Ok(())
    }

    async fn delete_role_grant(
        &mut self,
        permission: PermissionId,
        role: &str,
        domain: &str,
    ) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = (permission, role.to_string(), domain.to_string());
        let grant_key = self.tables.role_key(&key);
        let removed = self.tables.role_grants.remove(&key).is_some();
        if removed {
            self.changes.extend(grant_key.map(GrantChange::Remove));
        }
        Ok(removed)
    }

    async fn user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
    ) -> StoreResult<Option<bool>> {
        self.ensure_open()?;
        let key = (permission, user.to_string());
        Ok(self.tables.user_grants.get(&key).copied())
    }

    async fn insert_user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
        allowed: bool,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        if !self.tables.permissions.contains_key(&permission) {
            return Err(StoreError::conflict(format!(
                "permission {permission} does not exist"
            )));
        }
        let key = (permission, user.to_string());
        if self.tables.user_grants.contains_key(&key) {
            return Err(StoreError::conflict(format!(
                "user grant already exists for '{user}' on permission {permission}"
            )));
        }
        let change = self.upsert_change(self.tables.user_key(&key), allowed);
        self.tables.user_grants.insert(key, allowed);
        self.changes.extend(change);
        Ok(())
    }

    async fn delete_user_grant(
        &mut self,
        permission: PermissionId,
        user: &str,
    ) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = (permission, user.to_string());
        let grant_key = self.tables.user_key(&key);
        let removed = self.tables.user_grants.remove(&key).is_some();
        if removed {
            self.changes.extend(grant_key.map(GrantChange::Remove));
        }
        Ok(removed)
    }

    async fn delete_grants_for_resource(&mut self, resource_id: &str) -> StoreResult<usize> {
        self.ensure_open()?;
        let roles = self.remove_role_rows(|_, row| row.resource_id == resource_id);
        let users = self.remove_user_rows(|_, row| row.resource_id == resource_id);
        Ok(roles + users)
    }

    async fn delete_permissions_for_resource(&mut self, resource_id: &str) -> StoreResult<usize> {
        self.ensure_open()?;
        let ids = self.tables.permission_ids_for(resource_id);
        if ids.is_empty() {
            return Ok(0);
        }
        let referenced = self
            .tables
            .role_grants
            .keys()
            .any(|(id, _, _)| ids.contains(id))
            || self.tables.user_grants.keys().any(|(id, _)| ids.contains(id));
        if referenced {
            if !self.referential_cascade {
                return Err(StoreError::conflict(format!(
                    "permission records for '{resource_id}' are still referenced by grants"
                )));
            }
            self.remove_role_rows(|key, _| ids.contains(&key.0));
            self.remove_user_rows(|key, _| ids.contains(&key.0));
        }
        for id in &ids {
            self.tables.permissions.remove(id);
        }
        Ok(ids.len())
    }

    async fn delete_role_grants(&mut self, role: &str, domain: &str) -> StoreResult<usize> {
        self.ensure_open()?;
        Ok(self.remove_role_rows(|(_, name, dom), _| name == role && dom == domain))
    }

    async fn delete_role_grants_for_action(
        &mut self,
        role: &str,
        domain: &str,
        action: &str,
    ) -> StoreResult<usize> {
        self.ensure_open()?;
        Ok(self.remove_role_rows(|(_, name, dom), row| {
            name == role && dom == domain && row.action == action
        }))
    }

    async fn delete_user_grants(&mut self, user: &str) -> StoreResult<usize> {
        self.ensure_open()?;
        Ok(self.remove_user_rows(|(_, name), _| name == user))
    }

    async fn rename_role(&mut self, old: &str, new: &str, domain: &str) -> StoreResult<usize> {
        self.ensure_open()?;
        if old == new {
            return Ok(0);
        }
        let moved: Vec<(RoleGrantKey, bool)> = self
            .tables
            .role_grants
            .iter()
            .filter(|((_, name, dom), _)| name == old && dom == domain)
            .map(|(key, allowed)| (key.clone(), *allowed))
            .collect();
        for ((permission, _, dom), allowed) in &moved {
            let old_key = (*permission, old.to_string(), dom.clone());
            let new_key = (*permission, new.to_string(), dom.clone());
            if let Some(grant_key) = self.tables.role_key(&old_key) {
                self.changes.push(GrantChange::Remove(grant_key));
            }
            self.tables.role_grants.remove(&old_key);
            let change = self.upsert_change(self.tables.role_key(&new_key), *allowed);
            self.tables.role_grants.insert(new_key, *allowed);
            self.changes.extend(change);
        }
        Ok(moved.len())
    }

    async fn is_system_role(&mut self, role: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.tables.system_roles.contains(role))
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let Some(mut guard) = self.guard.take() else {
            return Err(StoreError::TransactionClosed);
        };
        guard.next_permission_id = self.next_permission_id;
        let tenant = guard.tenant(self.tenant);
        tenant.tables = std::mem::replace(&mut self.tables, Tables::seeded());
        let count = self.changes.len();
        for change in self.changes.drain(..) {
            tenant.log.record(change);
        }
        debug!(
            tenant = %self.tenant,
            changes = count,
            next_seq = tenant.log.next_seq,
            "committed transaction"
        );
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        if self.guard.take().is_none() {
            return Err(StoreError::TransactionClosed);
        }
        debug!(
            tenant = %self.tenant,
            discarded = self.changes.len(),
            "rolled back transaction"
        );
        self.changes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: TenantId = TenantId::SUPER;

    async fn grant_role(store: &InMemoryStore, role: &str, resource: &str, allowed: bool) {
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission(resource, "read").await.unwrap();
        tx.insert_role_grant(id, role, PRIMARY_DOMAIN, allowed)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    fn changes(feed: ChangeFeed) -> ChangeSet {
        match feed {
            ChangeFeed::Changes(set) => set,
            ChangeFeed::Expired => panic!("expected changes"),
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = InMemoryStore::new();
        grant_role(&store, "manager", "/apps", true).await;

        let snapshot = store.snapshot(T).await.unwrap();
        assert_eq!(snapshot.grants.len(), 1);
        assert_eq!(snapshot.next_seq, 1);
        let grant = &snapshot.grants[0];
        assert_eq!(grant.key.subject, "manager");
        assert_eq!(grant.key.domain.as_deref(), Some(PRIMARY_DOMAIN));
        assert!(grant.allowed);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/apps", "read").await.unwrap();
        tx.insert_user_grant(id, "alice", true).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.grant_count(T).await, 0);
        assert_eq!(store.permission_count(T).await, 0);
    }

    #[tokio::test]
    async fn test_closed_transaction_rejects_calls() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(T).await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.permission_id("/a", "read").await,
            Err(StoreError::TransactionClosed)
        ));
        assert!(matches!(tx.rollback().await, Err(StoreError::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_dropped_transaction_releases_lock() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin(T).await.unwrap();
            tx.ensure_permission("/a", "read").await.unwrap();
        }
        assert_eq!(store.permission_count(T).await, 0);
        let _tx = store.begin(T).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_grant_conflicts() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/a", "read").await.unwrap();
        tx.insert_role_grant(id, "r", PRIMARY_DOMAIN, true).await.unwrap();
        let err = tx
            .insert_role_grant(id, "r", PRIMARY_DOMAIN, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_domain() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/a", "read").await.unwrap();
        let err = tx.insert_role_grant(id, "eng", "LDAP", true).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownDomain { .. }));
        tx.rollback().await.unwrap();

        store.register_domain(T, "ldap").await;
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/a", "read").await.unwrap();
        tx.insert_role_grant(id, "eng", "LDAP", true).await.unwrap();
        tx.commit().await.unwrap();

        let snapshot = store.snapshot(T).await.unwrap();
        assert_eq!(snapshot.grants[0].qualified_subject(), "LDAP/eng");
    }

    #[tokio::test]
    async fn test_ensure_permission_reuses_record() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(T).await.unwrap();
        let first = tx.ensure_permission("/a", "read").await.unwrap();
        let second = tx.ensure_permission("/a", "read").await.unwrap();
        let other = tx.ensure_permission("/a", "write").await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(tx.permission_id("/a", "read").await.unwrap(), Some(first));
        assert_eq!(tx.permission_id("/b", "read").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_change_feed() {
        let store = InMemoryStore::new();
        grant_role(&store, "r", "/a", true).await;
        let checkpoint = store.snapshot(T).await.unwrap().next_seq;

        let mut tx = store.begin(T).await.unwrap();
        let id = tx.permission_id("/a", "read").await.unwrap().unwrap();
        tx.delete_role_grant(id, "r", PRIMARY_DOMAIN).await.unwrap();
        tx.insert_role_grant(id, "r", PRIMARY_DOMAIN, false).await.unwrap();
        tx.commit().await.unwrap();

        let set = changes(store.changes_since(T, checkpoint).await.unwrap());
        assert_eq!(set.changes.len(), 2);
        assert!(matches!(set.changes[0].change, GrantChange::Remove(_)));
        assert!(matches!(
            &set.changes[1].change,
            GrantChange::Upsert(grant) if !grant.allowed
        ));
        assert_eq!(set.next_seq, 3);

        let empty = changes(store.changes_since(T, set.next_seq).await.unwrap());
        assert!(empty.changes.is_empty());
    }

    #[tokio::test]
    async fn test_change_feed_expires() {
        let store = InMemoryStore::with_retention(2);
        for i in 0..4 {
            grant_role(&store, &format!("r{i}"), "/a", true).await;
        }
        assert!(matches!(
            store.changes_since(T, 0).await.unwrap(),
            ChangeFeed::Expired
        ));
        let recent = changes(store.changes_since(T, 2).await.unwrap());
        assert_eq!(recent.changes.len(), 2);
        assert!(matches!(
            store.changes_since(T, 99).await.unwrap(),
            ChangeFeed::Expired
        ));
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryStore::new();
        grant_role(&store, "r", "/a", true).await;
        let other = TenantId::new(7);
        assert!(store.snapshot(other).await.unwrap().grants.is_empty());
        assert!(store
            .resource_ids_for_action(other, "read")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store.resource_ids_for_action(T, "read").await.unwrap(),
            vec!["/a"]
        );
    }

    #[tokio::test]
    async fn test_delete_grants_for_resource() {
        let store = InMemoryStore::new();
        grant_role(&store, "r", "/a", true).await;
        grant_role(&store, "s", "/b", true).await;

        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/a", "write").await.unwrap();
        tx.insert_user_grant(id, "alice", true).await.unwrap();
        assert_eq!(tx.delete_grants_for_resource("/a").await.unwrap(), 2);
        tx.commit().await.unwrap();

        assert_eq!(store.grant_count(T).await, 1);
        assert_eq!(store.permission_count(T).await, 3);
    }

    #[tokio::test]
    async fn test_delete_permissions_cascades() {
        let store = InMemoryStore::new();
        grant_role(&store, "r", "/a", true).await;

        let mut tx = store.begin(T).await.unwrap();
        assert_eq!(tx.delete_permissions_for_resource("/a").await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert_eq!(store.grant_count(T).await, 0);
        assert_eq!(store.permission_count(T).await, 0);
    }

    #[tokio::test]
    async fn test_delete_permissions_without_cascade() {
        let store = InMemoryStore::new().without_referential_cascade();
        grant_role(&store, "r", "/a", true).await;

        let mut tx = store.begin(T).await.unwrap();
        let err = tx.delete_permissions_for_resource("/a").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        tx.delete_grants_for_resource("/a").await.unwrap();
        assert_eq!(tx.delete_permissions_for_resource("/a").await.unwrap(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_role_grants_for_action() {
        let store = InMemoryStore::new();
        grant_role(&store, "r", "/a", true).await;
        let mut tx = store.begin(T).await.unwrap();
        let id = tx.ensure_permission("/a", "write").await.unwrap();
        tx.insert_role_grant(id, "r", PRIMARY_DOMAIN, true).await.unwrap();
        assert_eq!(
            tx.delete_role_grants_for_action("r", PRIMARY_DOMAIN, "read")
                .await
                .unwrap(),
            1
        );
        assert_eq!(tx.delete_role_grants("r", PRIMARY_DOMAIN).await.unwrap(), 1);
        tx.commit().await.unwrap();
        assert_eq!(store.grant_count(T).await, 0);
    }

    #[tokio::test]
    async fn test_rename_role() {
        let store = InMemoryStore::new();
        grant_role(&store, "old", "/a", true).await;
        grant_role(&store, "old", "/b", false).await;

        let mut tx = store.begin(T).await.unwrap();
        assert_eq!(tx.rename_role("old", "new", PRIMARY_DOMAIN).await.unwrap(), 2);
        assert_eq!(tx.rename_role("old", "new", "INTERNAL").await.unwrap(), 0);
        tx.commit().await.unwrap();

        let snapshot = store.snapshot(T).await.unwrap();
        assert!(snapshot.grants.iter().all(|g| g.key.subject == "new"));
        assert_eq!(snapshot.grants.len(), 2);
    }

    #[tokio::test]
    async fn test_system_roles() {
        let store = InMemoryStore::new();
        store.add_system_role(T, "wheel").await;
        let mut tx = store.begin(T).await.unwrap();
        assert!(tx.is_system_role("wheel").await.unwrap());
        assert!(!tx.is_system_role("admin").await.unwrap());
    }
}
