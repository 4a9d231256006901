//! Name normalization.

use warden_core::domain::canonical_role_name;
use warden_core::{QualifiedRole, SubjectKind};
use warden_store::GrantKey;
use warden_tree::split;

/// Applies the configured case rules to subject, resource and action names.
///
/// Case-insensitive deployments lowercase every name before it reaches the
/// store, the tree or the cache; role domains are always uppercased.
/// Resource ids are also rewritten to their split form, so `/a/`, `a` and
/// `/a` share one permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Normalizer {
    case_sensitive: bool,
}

impl Normalizer {
    pub(crate) const fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    fn modify(&self, name: &str) -> String {
        let name = name.trim();
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Canonical role name as indexed in the tree.
    pub(crate) fn role(&self, role: &str) -> String {
        canonical_role_name(&self.modify(role))
    }

    /// Role split for persistence.
    pub(crate) fn qualified_role(&self, role: &str) -> QualifiedRole {
        QualifiedRole::parse(&self.modify(role))
    }

    pub(crate) fn user(&self, user: &str) -> String {
        self.modify(user)
    }

    pub(crate) fn resource(&self, resource: &str) -> String {
        split(&self.modify(resource)).to_string()
    }

    pub(crate) fn subject(&self, subject: &str, kind: SubjectKind) -> String {
        match kind {
            SubjectKind::Role => self.role(subject),
            SubjectKind::User => self.user(subject),
        }
    }

    /// Tree name of a persisted grant's subject.
    pub(crate) fn stored_subject(&self, key: &GrantKey) -> String {
        match (key.kind, &key.domain) {
            (SubjectKind::Role, Some(domain)) => {
                QualifiedRole::from_stored(self.modify(&key.subject), domain.clone()).canonical()
            }
            (kind, _) => self.subject(&key.subject, kind),
        }
    }
}
