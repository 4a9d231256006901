//! Arena nodes of the permission tree.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. A node
//! stores, per subject, two bitmasks over permission categories: one for
//! explicit allows and one for explicit denies. A category bit is set in at
//! most one of the two masks.

use std::collections::HashMap;

use warden_core::{Decision, SubjectKind};

use crate::category::PermissionCategory;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node.
    pub const ROOT: Self = Self(0);

    pub(crate) fn from_index(index: usize) -> Self {
        // The arena never grows past u32::MAX nodes.
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Explicit decisions of one subject on one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionSet {
    allow: u64,
    deny: u64,
}

impl DecisionSet {
    /// Returns the decision recorded for `category`.
    pub fn get(&self, category: PermissionCategory) -> Option<Decision> {
        let bit = category.mask();
        if self.allow & bit != 0 {
            Some(Decision::Allow)
        } else if self.deny & bit != 0 {
            Some(Decision::Deny)
        } else {
            None
        }
    }

    /// Records `decision` for `category`, replacing any prior decision.
    pub fn set(&mut self, category: PermissionCategory, decision: Decision) {
        let bit = category.mask();
        match decision {
            Decision::Allow => {
                self.allow |= bit;
                self.deny &= !bit;
            }
            Decision::Deny => {
                self.deny |= bit;
                self.allow &= !bit;
            }
        }
    }

    /// Removes the decision for `category`. Returns true if one existed.
    pub fn clear(&mut self, category: PermissionCategory) -> bool {
        let bit = category.mask();
        let had = (self.allow | self.deny) & bit != 0;
        self.allow &= !bit;
        self.deny &= !bit;
        had
    }

    /// Overlays `other` on top of this set; `other` wins per category.
    pub fn overlay(&mut self, other: Self) {
        let touched = other.allow | other.deny;
        self.allow = (self.allow & !touched) | other.allow;
        self.deny = (self.deny & !touched) | other.deny;
    }

    /// Returns true if no category carries a decision.
    pub fn is_empty(&self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

/// A node in the permission tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Path component this node represents; empty for the root.
    pub key: String,

    /// Parent node; `None` only for the root.
    pub parent: Option<NodeId>,

    /// Children keyed by component.
    pub children: HashMap<String, NodeId>,

    roles: HashMap<String, DecisionSet>,
    users: HashMap<String, DecisionSet>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::new(String::new(), None)
    }

    pub(crate) fn new(key: String, parent: Option<NodeId>) -> Self {
        Self {
            key,
            parent,
            children: HashMap::new(),
            roles: HashMap::new(),
            users: HashMap::new(),
        }
    }

    /// Decisions recorded on this node for subjects of `kind`.
    pub fn subjects(&self, kind: SubjectKind) -> &HashMap<String, DecisionSet> {
        match kind {
            SubjectKind::Role => &self.roles,
            SubjectKind::User => &self.users,
        }
    }

    pub(crate) fn subjects_mut(&mut self, kind: SubjectKind) -> &mut HashMap<String, DecisionSet> {
        match kind {
            SubjectKind::Role => &mut self.roles,
            SubjectKind::User => &mut self.users,
        }
    }

    /// Returns the decision of `subject` for `category` on this node.
    pub fn decision(
        &self,
        subject: &str,
        kind: SubjectKind,
        category: PermissionCategory,
    ) -> Option<Decision> {
        self.subjects(kind)
            .get(subject)
            .and_then(|set| set.get(category))
    }

    /// Returns true if any subject has a decision here.
    pub fn has_decisions(&self) -> bool {
        !self.roles.is_empty() || !self.users.is_empty()
    }

    /// Returns true if the node can be removed from the tree.
    pub(crate) fn is_prunable(&self) -> bool {
        self.parent.is_some() && self.children.is_empty() && !self.has_decisions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(index: u8) -> PermissionCategory {
        PermissionCategory::new(index)
    }

    #[test]
    fn test_decision_set_polarity_exclusive() {
        let mut set = DecisionSet::default();
        set.set(cat(1), Decision::Allow);
        assert_eq!(set.get(cat(1)), Some(Decision::Allow));
        set.set(cat(1), Decision::Deny);
        assert_eq!(set.get(cat(1)), Some(Decision::Deny));
        assert_eq!(set.get(cat(2)), None);
    }

    #[test]
    fn test_decision_set_clear() {
        let mut set = DecisionSet::default();
        set.set(cat(0), Decision::Allow);
        assert!(set.clear(cat(0)));
        assert!(!set.clear(cat(0)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_decision_set_overlay() {
        let mut base = DecisionSet::default();
        base.set(cat(0), Decision::Allow);
        base.set(cat(1), Decision::Allow);

        let mut top = DecisionSet::default();
        top.set(cat(1), Decision::Deny);
        top.set(cat(2), Decision::Allow);

        base.overlay(top);
        assert_eq!(base.get(cat(0)), Some(Decision::Allow));
        assert_eq!(base.get(cat(1)), Some(Decision::Deny));
        assert_eq!(base.get(cat(2)), Some(Decision::Allow));
    }

    #[test]
    fn test_node_prunable() {
        let root = Node::root();
        assert!(!root.is_prunable());

        let mut child = Node::new("a".into(), Some(NodeId::ROOT));
        assert!(child.is_prunable());
        child
            .subjects_mut(SubjectKind::User)
            .entry("alice".into())
            .or_default()
            .set(cat(0), Decision::Allow);
        assert!(!child.is_prunable());
        assert_eq!(
            child.decision("alice", SubjectKind::User, cat(0)),
            Some(Decision::Allow)
        );
        assert_eq!(child.decision("alice", SubjectKind::Role, cat(0)), None);
    }
}
