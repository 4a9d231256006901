//! Synchronised permission tree.
//!
//! [`PermissionIndex`] owns one tenant's [`PermissionTree`] and keeps it in
//! step with the store's change feed. Readers take a shared lock; structural
//! mutations take the exclusive lock and never span an `.await`.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use warden_core::{Decision, SubjectKind, TenantId};
use warden_store::{ChangeFeed, GrantChange, GrantKey, PermissionStore, StoreResult};
use warden_telemetry::metrics::record_tree_refresh;
use warden_tree::{split, ActionVocabulary, PermissionTree};

use crate::names::Normalizer;

/// How a refresh brought the tree up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// The tree was rebuilt from a snapshot.
    Full,
    /// Logged changes were replayed onto the tree.
    Incremental,
    /// A fetch that started after the caller arrived already did the work.
    Coalesced,
}

/// What a refresh changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// How the tree was brought up to date.
    pub mode: RefreshMode,
    /// True if a replayed change touched a role ruling.
    pub roles_changed: bool,
    /// Users whose rulings were touched by replayed changes.
    pub users_changed: BTreeSet<String>,
}

impl RefreshOutcome {
    fn new(mode: RefreshMode) -> Self {
        Self {
            mode,
            roles_changed: false,
            users_changed: BTreeSet::new(),
        }
    }

    /// Returns true if cached decisions may be stale for the whole tenant.
    pub fn affects_tenant(&self) -> bool {
        self.mode == RefreshMode::Full || self.roles_changed
    }
}

#[derive(Debug, Default)]
struct IndexState {
    tree: PermissionTree,
    /// Next change-log position to request; `None` until the first load.
    checkpoint: Option<u64>,
}

/// A tenant's permission tree plus its synchronisation state.
#[derive(Debug)]
pub struct PermissionIndex {
    tenant: TenantId,
    vocabulary: ActionVocabulary,
    names: Normalizer,
    state: RwLock<IndexState>,
    gate: Mutex<()>,
    /// Number of fetches started so far.
    started: AtomicU64,
    /// Number of the latest fetch that completed and was applied.
    completed: AtomicU64,
}

impl PermissionIndex {
    /// Creates an unloaded index.
    pub(crate) fn new(tenant: TenantId, vocabulary: ActionVocabulary, names: Normalizer) -> Self {
        Self {
            tenant,
            vocabulary,
            names,
            state: RwLock::new(IndexState::default()),
            gate: Mutex::new(()),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Tenant the index mirrors.
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Action vocabulary used to categorise rulings.
    pub fn vocabulary(&self) -> &ActionVocabulary {
        &self.vocabulary
    }

    /// Returns true once the tree has been loaded from the store.
    pub fn is_loaded(&self) -> bool {
        self.state.read().checkpoint.is_some()
    }

    /// Runs `f` against the current tree under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&PermissionTree) -> R) -> R {
        f(&self.state.read().tree)
    }

    /// Drops the tree; the next refresh performs a full reload.
    pub async fn unload(&self) {
        let _gate = self.gate.lock().await;
        let mut state = self.state.write();
        state.tree.clear();
        state.checkpoint = None;
    }

    /// Brings the tree up to date with committed store state.
    ///
    /// Replays the change feed when possible and falls back to a full reload
    /// when the tree was never loaded or the feed expired. Concurrent calls
    /// coalesce: a caller reuses any fetch that started after it arrived.
    /// On failure the tree is left as it was.
    pub async fn refresh(&self, store: &dyn PermissionStore) -> StoreResult<RefreshOutcome> {
        let arrival = self.started.load(Ordering::SeqCst);
        let _gate = self.gate.lock().await;
        if self.completed.load(Ordering::SeqCst) > arrival {
            return Ok(RefreshOutcome::new(RefreshMode::Coalesced));
        }

        let fetch = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let checkpoint = self.state.read().checkpoint;
        let outcome = match checkpoint {
            None => self.load_snapshot(store).await?,
            Some(since) => match store.changes_since(self.tenant, since).await? {
                ChangeFeed::Changes(set) => {
                    let mut outcome = RefreshOutcome::new(RefreshMode::Incremental);
                    if !set.changes.is_empty() {
                        let mut state = self.state.write();
                        for sequenced in &set.changes {
                            self.apply_change(&mut state.tree, &sequenced.change, &mut outcome);
                        }
                        state.checkpoint = Some(set.next_seq);
                        debug!(
                            tenant = %self.tenant,
                            changes = set.changes.len(),
                            next_seq = set.next_seq,
                            "replayed change feed"
                        );
                    } else {
                        self.state.write().checkpoint = Some(set.next_seq);
                    }
                    record_tree_refresh("incremental");
                    outcome
                }
                ChangeFeed::Expired => {
                    debug!(tenant = %self.tenant, since, "change feed expired; reloading");
                    self.load_snapshot(store).await?
                }
            },
        };

        self.completed.store(fetch, Ordering::SeqCst);
        Ok(outcome)
    }

    /// Rebuilds the tree from a store snapshot, regardless of its checkpoint.
    pub async fn full_reload(&self, store: &dyn PermissionStore) -> StoreResult<RefreshOutcome> {
        let _gate = self.gate.lock().await;
        let fetch = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.load_snapshot(store).await?;
        self.completed.store(fetch, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn load_snapshot(&self, store: &dyn PermissionStore) -> StoreResult<RefreshOutcome> {
        let snapshot = store.snapshot(self.tenant).await?;

        // Built off-lock and swapped in whole.
        let mut tree = PermissionTree::new();
        let mut outcome = RefreshOutcome::new(RefreshMode::Full);
        for grant in &snapshot.grants {
            self.apply_upsert(&mut tree, &grant.key, grant.allowed, &mut outcome);
        }

        let nodes = tree.node_count();
        {
            let mut state = self.state.write();
            state.tree = tree;
            state.checkpoint = Some(snapshot.next_seq);
        }
        record_tree_refresh("full");
        debug!(
            tenant = %self.tenant,
            grants = snapshot.grants.len(),
            nodes,
            next_seq = snapshot.next_seq,
            "loaded permission tree"
        );
        Ok(outcome)
    }

    fn apply_change(&self, tree: &mut PermissionTree, change: &GrantChange, outcome: &mut RefreshOutcome) {
        match change {
            GrantChange::Upsert(grant) => {
                self.apply_upsert(tree, &grant.key, grant.allowed, outcome);
            }
            GrantChange::Remove(key) => {
                let Ok(category) = self.vocabulary.category_of(&key.action) else {
                    return;
                };
                let subject = self.names.stored_subject(key);
                let path = split(&self.names.resource(&key.resource_id));
                tree.clear_decision(&subject, key.kind, &path, category);
                note_change(outcome, key.kind, subject);
            }
        }
    }

    fn apply_upsert(
        &self,
        tree: &mut PermissionTree,
        key: &GrantKey,
        allowed: bool,
        outcome: &mut RefreshOutcome,
    ) {
        let category = match self.vocabulary.category_of(&key.action) {
            Ok(category) => category,
            Err(_) => {
                warn!(
                    tenant = %self.tenant,
                    action = %key.action,
                    resource = %key.resource_id,
                    "skipping stored grant with unknown action"
                );
                return;
            }
        };
        let subject = self.names.stored_subject(key);
        let path = split(&self.names.resource(&key.resource_id));
        tree.set_decision(&subject, key.kind, &path, category, Decision::from_allowed(allowed));
        note_change(outcome, key.kind, subject);
    }
}

fn note_change(outcome: &mut RefreshOutcome, kind: SubjectKind, subject: String) {
    if outcome.mode != RefreshMode::Incremental {
        return;
    }
    match kind {
        SubjectKind::Role => outcome.roles_changed = true,
        SubjectKind::User => {
            outcome.users_changed.insert(subject);
        }
    }
}
