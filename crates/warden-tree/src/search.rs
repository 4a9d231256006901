//! Query results.

use std::collections::BTreeSet;

use warden_core::Decision;

/// Outcome of a point or reverse query against the permission tree.
///
/// For a point query, [`decision`](Self::decision) is the running decision
/// after walking from the root towards the requested path: the most specific
/// explicit ruling wins. For a reverse query, [`subjects`](Self::subjects)
/// holds every subject with an explicit ruling of the wanted polarity at or
/// below the requested node.
///
/// [`is_exact_match`](Self::is_exact_match) tells apart a path that has no
/// node at all (no rules were ever recorded at or below it) from a node that
/// exists but grants nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub(crate) decision: Option<Decision>,
    pub(crate) matched_depth: usize,
    pub(crate) requested_depth: usize,
    pub(crate) subjects: BTreeSet<String>,
}

impl SearchResult {
    /// Returns true if the deepest matching node resolved to allow.
    pub fn last_node_allowed_access(&self) -> bool {
        self.decision == Some(Decision::Allow)
    }

    /// The resolved decision, if any node on the path carried one.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Number of path components that matched existing nodes.
    pub fn matched_depth(&self) -> usize {
        self.matched_depth
    }

    /// Returns true if the node for the full requested path exists.
    pub fn is_exact_match(&self) -> bool {
        self.matched_depth == self.requested_depth
    }

    /// Subjects collected by a reverse query.
    pub fn subjects(&self) -> &BTreeSet<String> {
        &self.subjects
    }

    /// Consumes the result, returning the collected subjects.
    pub fn into_subjects(self) -> BTreeSet<String> {
        self.subjects
    }
}
