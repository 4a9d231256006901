//! Persisted record types and the change feed.

use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::{QualifiedRole, SubjectKind, TenantId};

/// Identifier of a permission record (one resource/action pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(u64);

impl PermissionId {
    /// Wraps a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one grant row, without its polarity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    /// Role or user.
    pub kind: SubjectKind,
    /// Subject name; roles are stored without their domain prefix.
    pub subject: String,
    /// Domain of a role grant; always `None` for users.
    pub domain: Option<String>,
    /// Resource identifier.
    pub resource_id: String,
    /// Action name.
    pub action: String,
}

impl GrantKey {
    /// Returns the subject name as the permission tree indexes it.
    ///
    /// Role names get their stored domain re-attached; primary and system
    /// domains are left off.
    pub fn qualified_subject(&self) -> String {
        match (&self.kind, &self.domain) {
            (SubjectKind::Role, Some(domain)) => {
                QualifiedRole::from_stored(self.subject.clone(), domain.clone()).canonical()
            }
            _ => self.subject.clone(),
        }
    }
}

/// A persisted allow/deny tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrant {
    /// Row identity.
    pub key: GrantKey,
    /// Owning tenant.
    pub tenant: TenantId,
    /// True for allow, false for deny.
    pub allowed: bool,
}

impl PersistedGrant {
    /// Returns the subject name as the permission tree indexes it.
    pub fn qualified_subject(&self) -> String {
        self.key.qualified_subject()
    }
}

/// A committed row-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GrantChange {
    /// A grant row was inserted or its polarity replaced.
    Upsert(PersistedGrant),
    /// A grant row was removed.
    Remove(GrantKey),
}

/// A change together with its position in the tenant's change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedChange {
    /// Log position.
    pub seq: u64,
    /// The change.
    pub change: GrantChange,
}

/// Full state of a tenant's grants.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Every grant of the tenant.
    pub grants: Vec<PersistedGrant>,
    /// Checkpoint to pass to the first `changes_since` call.
    pub next_seq: u64,
}

/// Changes committed since a checkpoint.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Changes in commit order.
    pub changes: Vec<SequencedChange>,
    /// Checkpoint to pass to the next `changes_since` call.
    pub next_seq: u64,
}

/// Answer to an incremental sync request.
#[derive(Debug, Clone)]
pub enum ChangeFeed {
    /// Every change since the checkpoint is still retained.
    Changes(ChangeSet),
    /// The checkpoint fell out of the retained window; reload a snapshot.
    Expired,
}
