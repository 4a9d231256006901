//! The permission tree.
//!
//! A trie over resource path components whose nodes carry explicit allow
//! and deny rulings per subject and permission category. Rulings are
//! inherited downwards: a query walks from the root towards the requested
//! resource and the deepest explicit ruling for the subject wins.
//!
//! Nodes are created lazily on the first write beneath them and pruned as
//! soon as they hold no rulings and have no children, so the tree only ever
//! contains the root plus the paths leading to recorded rulings.

use std::collections::{BTreeSet, HashMap};

use warden_core::{Decision, SubjectKind};

use crate::category::PermissionCategory;
use crate::node::{Node, NodeId};
use crate::path::{collapse_prefixes, ResourcePath};
use crate::search::SearchResult;

/// Arena-backed permission tree.
///
/// # Example
///
/// ```rust
/// use warden_core::{Decision, SubjectKind};
/// use warden_tree::{ActionVocabulary, PermissionTree, ResourcePath};
///
/// let vocabulary = ActionVocabulary::default();
/// let read = vocabulary.category_of("read").unwrap();
///
/// let mut tree = PermissionTree::new();
/// tree.set_decision("manager", SubjectKind::Role, &ResourcePath::parse("/apps"), read, Decision::Allow);
/// tree.set_decision("manager", SubjectKind::Role, &ResourcePath::parse("/apps/audit"), read, Decision::Deny);
///
/// let allowed = tree.point_query("manager", SubjectKind::Role, read, &ResourcePath::parse("/apps/reports"));
/// assert!(allowed.last_node_allowed_access());
///
/// let denied = tree.point_query("manager", SubjectKind::Role, read, &ResourcePath::parse("/apps/audit/x"));
/// assert!(!denied.last_node_allowed_access());
/// ```
#[derive(Debug, Clone)]
pub struct PermissionTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    live: usize,
}

impl Default for PermissionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionTree {
    /// Creates a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::root())],
            free: Vec::new(),
            live: 1,
        }
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Returns true if the tree carries no rulings.
    pub fn is_empty(&self) -> bool {
        self.live == 1 && self.get(NodeId::ROOT).map_or(true, |root| !root.has_decisions())
    }

    /// Returns the node with the given id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn child(&self, id: NodeId, component: &str) -> Option<NodeId> {
        self.get(id)
            .and_then(|node| node.children.get(component))
            .copied()
    }

    /// Descends as far as existing nodes allow.
    ///
    /// Returns the deepest node reached and the number of components matched.
    fn locate(&self, path: &ResourcePath) -> (NodeId, usize) {
        let mut current = NodeId::ROOT;
        let mut depth = 0;
        for component in path.components() {
            match self.child(current, component) {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (current, depth)
    }

    fn exact(&self, path: &ResourcePath) -> Option<NodeId> {
        let (id, depth) = self.locate(path);
        (depth == path.len()).then_some(id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolves the decision of one subject for `path`.
    ///
    /// Each node on the way down that carries an explicit ruling for the
    /// subject and category replaces the running decision. The walk stops at
    /// the first missing child, so the most specific existing ancestor
    /// applies. Without any ruling the result is not allowed.
    pub fn point_query(
        &self,
        subject: &str,
        kind: SubjectKind,
        category: PermissionCategory,
        path: &ResourcePath,
    ) -> SearchResult {
        let mut decision = self
            .get(NodeId::ROOT)
            .and_then(|root| root.decision(subject, kind, category));
        let mut current = NodeId::ROOT;
        let mut depth = 0;

        for component in path.components() {
            let Some(child) = self.child(current, component) else {
                break;
            };
            current = child;
            depth += 1;
            if let Some(found) = self
                .get(current)
                .and_then(|node| node.decision(subject, kind, category))
            {
                decision = Some(found);
            }
        }

        SearchResult {
            decision,
            matched_depth: depth,
            requested_depth: path.len(),
            subjects: BTreeSet::new(),
        }
    }

    /// Collects subjects with an explicit `wanted` ruling at or below `path`.
    ///
    /// Every node is reported independently; a deny deeper down does not
    /// remove a subject allowed higher up. A path without a node yields an
    /// empty, non-exact result.
    pub fn reverse_query(
        &self,
        path: &ResourcePath,
        category: PermissionCategory,
        wanted: Decision,
        kind: SubjectKind,
    ) -> SearchResult {
        let (start, depth) = self.locate(path);
        let mut subjects = BTreeSet::new();

        if depth == path.len() {
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                let Some(node) = self.get(id) else { continue };
                for (name, set) in node.subjects(kind) {
                    if set.get(category) == Some(wanted) {
                        subjects.insert(name.clone());
                    }
                }
                stack.extend(node.children.values().copied());
            }
        }

        SearchResult {
            decision: None,
            matched_depth: depth,
            requested_depth: path.len(),
            subjects,
        }
    }

    /// Returns the subjects whose inherited ruling on `path` is allow.
    ///
    /// Applies the same override walk as [`point_query`](Self::point_query)
    /// to every subject at once.
    pub fn effective_subjects(
        &self,
        path: &ResourcePath,
        category: PermissionCategory,
        kind: SubjectKind,
    ) -> BTreeSet<String> {
        let mut running: HashMap<&str, Decision> = HashMap::new();
        let mut current = NodeId::ROOT;
        if let Some(root) = self.get(current) {
            record_rulings(root, kind, category, &mut running);
        }
        for component in path.components() {
            let Some(child) = self.child(current, component) else {
                break;
            };
            current = child;
            if let Some(node) = self.get(current) {
                record_rulings(node, kind, category, &mut running);
            }
        }

        running
            .into_iter()
            .filter(|(_, decision)| decision.is_allow())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Returns the explicit ruling recorded on exactly `path`.
    pub fn decision_at(
        &self,
        subject: &str,
        kind: SubjectKind,
        path: &ResourcePath,
        category: PermissionCategory,
    ) -> Option<Decision> {
        self.exact(path)
            .and_then(|id| self.get(id))
            .and_then(|node| node.decision(subject, kind, category))
    }

    /// Lists the topmost resources under `root` that `roles` or `user` reach.
    ///
    /// A resource counts as reachable when the inherited ruling of the user,
    /// or of any of the roles, is allow. Descendants of a reachable resource
    /// are not listed separately. The output is sorted.
    pub fn allowed_resources(
        &self,
        roles: &[String],
        user: Option<&str>,
        category: PermissionCategory,
        root: &ResourcePath,
    ) -> Vec<String> {
        let subjects: Vec<(&str, SubjectKind)> = roles
            .iter()
            .map(|role| (role.as_str(), SubjectKind::Role))
            .chain(user.map(|name| (name, SubjectKind::User)))
            .collect();
        if subjects.is_empty() {
            return Vec::new();
        }

        let apply = |node: &Node, state: &mut [Option<Decision>]| {
            for (slot, (name, kind)) in state.iter_mut().zip(&subjects) {
                if let Some(decision) = node.decision(name, *kind, category) {
                    *slot = Some(decision);
                }
            }
        };

        let mut state = vec![None; subjects.len()];
        let mut current = NodeId::ROOT;
        if let Some(node) = self.get(current) {
            apply(node, &mut state);
        }
        for component in root.components() {
            let Some(child) = self.child(current, component) else {
                return Vec::new();
            };
            current = child;
            if let Some(node) = self.get(current) {
                apply(node, &mut state);
            }
        }

        let mut found = Vec::new();
        let mut stack = vec![(current, root.to_string(), state)];
        while let Some((id, path, state)) = stack.pop() {
            if state.contains(&Some(Decision::Allow)) {
                found.push(path);
                continue;
            }
            let Some(node) = self.get(id) else { continue };
            for (key, child) in &node.children {
                let Some(child_node) = self.get(*child) else {
                    continue;
                };
                let mut child_state = state.clone();
                apply(child_node, &mut child_state);
                let child_path = if path == "/" {
                    format!("/{key}")
                } else {
                    format!("{path}/{key}")
                };
                stack.push((*child, child_path, child_state));
            }
        }

        collapse_prefixes(found)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            NodeId::from_index(self.nodes.len() - 1)
        }
    }

    fn ensure_path(&mut self, path: &ResourcePath) -> NodeId {
        let mut current = NodeId::ROOT;
        for component in path.components() {
            current = match self.child(current, component) {
                Some(child) => child,
                None => {
                    let child = self.alloc(Node::new(component.to_string(), Some(current)));
                    if let Some(parent) = self.get_mut(current) {
                        parent.children.insert(component.to_string(), child);
                    }
                    child
                }
            };
        }
        current
    }

    /// Removes `id` and its empty ancestors, stopping at content or the root.
    fn prune_upward(&mut self, id: NodeId) {
        let mut current = id;
        loop {
            let prunable = self.get(current).is_some_and(Node::is_prunable);
            if !prunable {
                break;
            }
            let Some(node) = self.nodes[current.index()].take() else {
                break;
            };
            self.free.push(current);
            self.live -= 1;
            match node.parent {
                Some(parent) => {
                    if let Some(parent_node) = self.get_mut(parent) {
                        parent_node.children.remove(&node.key);
                    }
                    current = parent;
                }
                None => break,
            }
        }
    }

    fn live_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeId::from_index(index))
            .collect()
    }

    /// Records a ruling, creating intermediate nodes as needed.
    ///
    /// Replaces any prior ruling for the same subject, node and category.
    pub fn set_decision(
        &mut self,
        subject: &str,
        kind: SubjectKind,
        path: &ResourcePath,
        category: PermissionCategory,
        decision: Decision,
    ) {
        let id = self.ensure_path(path);
        if let Some(node) = self.get_mut(id) {
            node.subjects_mut(kind)
                .entry(subject.to_string())
                .or_default()
                .set(category, decision);
        }
    }

    /// Removes one ruling. Returns true if it existed.
    pub fn clear_decision(
        &mut self,
        subject: &str,
        kind: SubjectKind,
        path: &ResourcePath,
        category: PermissionCategory,
    ) -> bool {
        let Some(id) = self.exact(path) else {
            return false;
        };
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        let subjects = node.subjects_mut(kind);
        let removed = match subjects.get_mut(subject) {
            Some(set) => {
                let removed = set.clear(category);
                if set.is_empty() {
                    subjects.remove(subject);
                }
                removed
            }
            None => false,
        };
        self.prune_upward(id);
        removed
    }

    /// Removes every ruling of `subject`. Returns the number of nodes touched.
    pub fn clear_subject(&mut self, subject: &str, kind: SubjectKind) -> usize {
        self.clear_subject_where(subject, kind, |_| true)
    }

    /// Removes every ruling of `subject` for `category`.
    pub fn clear_subject_category(
        &mut self,
        subject: &str,
        kind: SubjectKind,
        category: PermissionCategory,
    ) -> usize {
        self.clear_subject_where(subject, kind, |set| {
            set.clear(category);
            set.is_empty()
        })
    }

    /// Visits every ruling set of `subject`; `strip` edits the set in place
    /// and reports whether the set should be dropped.
    fn clear_subject_where<F>(&mut self, subject: &str, kind: SubjectKind, mut strip: F) -> usize
    where
        F: FnMut(&mut crate::node::DecisionSet) -> bool,
    {
        let mut touched = Vec::new();
        for id in self.live_ids() {
            let Some(node) = self.get_mut(id) else { continue };
            let subjects = node.subjects_mut(kind);
            let Some(set) = subjects.get_mut(subject) else {
                continue;
            };
            let before = *set;
            if strip(set) {
                subjects.remove(subject);
                touched.push(id);
            } else if *set != before {
                touched.push(id);
            }
        }
        let count = touched.len();
        for id in touched {
            self.prune_upward(id);
        }
        count
    }

    /// Removes all rulings recorded on exactly `path`, for every subject.
    ///
    /// Rulings on descendants are kept. Returns true if the node existed.
    pub fn clear_resource(&mut self, path: &ResourcePath) -> bool {
        let Some(id) = self.exact(path) else {
            return false;
        };
        if let Some(node) = self.get_mut(id) {
            node.subjects_mut(SubjectKind::Role).clear();
            node.subjects_mut(SubjectKind::User).clear();
        }
        self.prune_upward(id);
        true
    }

    /// Moves every ruling of `old` onto `new`.
    ///
    /// Where both names carry a ruling for the same node and category, the
    /// ruling of `old` wins. Returns the number of nodes touched.
    pub fn rename_subject(&mut self, old: &str, new: &str, kind: SubjectKind) -> usize {
        if old == new {
            return 0;
        }
        let mut touched = 0;
        for id in self.live_ids() {
            let Some(node) = self.get_mut(id) else { continue };
            let subjects = node.subjects_mut(kind);
            if let Some(moved) = subjects.remove(old) {
                subjects.entry(new.to_string()).or_default().overlay(moved);
                touched += 1;
            }
        }
        touched
    }

    /// Drops every node and ruling.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

fn record_rulings<'a>(
    node: &'a Node,
    kind: SubjectKind,
    category: PermissionCategory,
    running: &mut HashMap<&'a str, Decision>,
) {
    for (name, set) in node.subjects(kind) {
        if let Some(decision) = set.get(category) {
            running.insert(name.as_str(), decision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionVocabulary;
    use proptest::prelude::*;

    fn path(id: &str) -> ResourcePath {
        ResourcePath::parse(id)
    }

    fn categories() -> (PermissionCategory, PermissionCategory) {
        let vocabulary = ActionVocabulary::default();
        (
            vocabulary.category_of("read").unwrap(),
            vocabulary.category_of("write").unwrap(),
        )
    }

    fn allowed(tree: &PermissionTree, subject: &str, kind: SubjectKind, id: &str) -> bool {
        let (read, _) = categories();
        tree.point_query(subject, kind, read, &path(id))
            .last_node_allowed_access()
    }

    #[test]
    fn test_inheritance_override() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Deny);

        assert!(!allowed(&tree, "r", SubjectKind::Role, "/a/b/c"));
        assert!(allowed(&tree, "r", SubjectKind::Role, "/a/x"));
        assert!(allowed(&tree, "r", SubjectKind::Role, "/a"));
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/"));
    }

    #[test]
    fn test_default_deny() {
        let tree = PermissionTree::new();
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/never"));
        assert!(!allowed(&tree, "u", SubjectKind::User, "/never"));
        assert_eq!(
            tree.point_query("r", SubjectKind::Role, categories().0, &path("/never"))
                .decision(),
            None
        );
    }

    #[test]
    fn test_root_ruling_applies_everywhere() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("admin", SubjectKind::Role, &path("/"), read, Decision::Allow);
        assert!(allowed(&tree, "admin", SubjectKind::Role, "/deep/er/path"));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_role_and_user_spaces_independent() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("sam", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        assert!(allowed(&tree, "sam", SubjectKind::Role, "/a"));
        assert!(!allowed(&tree, "sam", SubjectKind::User, "/a"));
    }

    #[test]
    fn test_categories_independent() {
        let (read, write) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        let result = tree.point_query("r", SubjectKind::Role, write, &path("/a"));
        assert!(!result.last_node_allowed_access());
    }

    #[test]
    fn test_set_decision_idempotent_and_replaces() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);
        assert_eq!(tree.node_count(), 3);

        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Deny);
        assert_eq!(
            tree.decision_at("r", SubjectKind::Role, &path("/a/b"), read),
            Some(Decision::Deny)
        );
    }

    #[test]
    fn test_point_query_reports_depth() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);

        let result = tree.point_query("r", SubjectKind::Role, read, &path("/a/b/c/d"));
        assert!(result.last_node_allowed_access());
        assert_eq!(result.matched_depth(), 2);
        assert!(!result.is_exact_match());
    }

    #[test]
    fn test_reverse_query_collects_subtree() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("top", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("mid", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);
        tree.set_decision("low", SubjectKind::Role, &path("/a/b/c"), read, Decision::Allow);
        tree.set_decision("no", SubjectKind::Role, &path("/a/b/c"), read, Decision::Deny);

        let result =
            tree.reverse_query(&path("/a/b"), read, Decision::Allow, SubjectKind::Role);
        assert!(result.is_exact_match());
        let names: Vec<&str> = result.subjects().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["low", "mid"]);

        let denied = tree.reverse_query(&path("/a"), read, Decision::Deny, SubjectKind::Role);
        assert_eq!(denied.into_subjects().into_iter().collect::<Vec<_>>(), vec!["no"]);
    }

    #[test]
    fn test_reverse_query_no_override_inference() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Deny);

        let allowed = tree.reverse_query(&path("/a"), read, Decision::Allow, SubjectKind::Role);
        let denied = tree.reverse_query(&path("/a"), read, Decision::Deny, SubjectKind::Role);
        assert!(allowed.subjects().contains("r"));
        assert!(denied.subjects().contains("r"));
    }

    #[test]
    fn test_reverse_query_missing_node() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);

        let missing = tree.reverse_query(&path("/a/b"), read, Decision::Allow, SubjectKind::Role);
        assert!(!missing.is_exact_match());
        assert!(missing.subjects().is_empty());

        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Deny);
        let nobody = tree.reverse_query(&path("/a/b"), read, Decision::Allow, SubjectKind::Role);
        assert!(nobody.is_exact_match());
        assert!(nobody.subjects().is_empty());
    }

    #[test]
    fn test_effective_subjects() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("viewer", SubjectKind::Role, &path("/apps"), read, Decision::Allow);
        tree.set_decision("auditor", SubjectKind::Role, &path("/apps/billing"), read, Decision::Allow);
        tree.set_decision("viewer", SubjectKind::Role, &path("/apps/billing/audit"), read, Decision::Deny);

        let at_reports = tree.effective_subjects(&path("/apps/billing/reports"), read, SubjectKind::Role);
        assert_eq!(at_reports.len(), 2);

        let at_audit = tree.effective_subjects(&path("/apps/billing/audit/q1"), read, SubjectKind::Role);
        assert_eq!(at_audit.into_iter().collect::<Vec<_>>(), vec!["auditor"]);
    }

    #[test]
    fn test_clear_decision_prunes_upward() {
        let (read, write) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a/b/c"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b/c"), write, Decision::Allow);
        assert_eq!(tree.node_count(), 4);

        assert!(tree.clear_decision("r", SubjectKind::Role, &path("/a/b/c"), read));
        assert_eq!(tree.node_count(), 4);
        assert!(tree.clear_decision("r", SubjectKind::Role, &path("/a/b/c"), write));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.is_empty());
        assert!(!tree.clear_decision("r", SubjectKind::Role, &path("/a/b/c"), write));
    }

    #[test]
    fn test_prune_stops_at_content() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b/c"), read, Decision::Allow);
        tree.clear_decision("r", SubjectKind::Role, &path("/a/b/c"), read);
        assert_eq!(tree.node_count(), 2);
        assert!(allowed(&tree, "r", SubjectKind::Role, "/a/b/c"));
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);
        tree.clear_subject("r", SubjectKind::Role);
        tree.set_decision("r", SubjectKind::Role, &path("/x/y"), read, Decision::Allow);
        assert_eq!(tree.nodes.len(), 3);
        assert!(allowed(&tree, "r", SubjectKind::Role, "/x/y"));
    }

    #[test]
    fn test_clear_subject() {
        let (read, write) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), write, Decision::Deny);
        tree.set_decision("s", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);

        assert_eq!(tree.clear_subject("r", SubjectKind::Role), 2);
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/a"));
        assert!(allowed(&tree, "s", SubjectKind::Role, "/a/b"));
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_clear_subject_category() {
        let (read, write) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/a"), write, Decision::Allow);
        tree.set_decision("r", SubjectKind::Role, &path("/b"), read, Decision::Allow);

        assert_eq!(tree.clear_subject_category("r", SubjectKind::Role, read), 2);
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/a"));
        assert_eq!(
            tree.decision_at("r", SubjectKind::Role, &path("/a"), write),
            Some(Decision::Allow)
        );
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_clear_resource_keeps_descendants() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("u", SubjectKind::User, &path("/a"), read, Decision::Allow);
        tree.set_decision("s", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);

        assert!(tree.clear_resource(&path("/a")));
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/a"));
        assert!(!allowed(&tree, "u", SubjectKind::User, "/a"));
        assert!(allowed(&tree, "s", SubjectKind::Role, "/a/b"));
        assert!(!tree.clear_resource(&path("/zzz")));
    }

    #[test]
    fn test_rename_subject() {
        let (read, write) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("old", SubjectKind::Role, &path("/a"), read, Decision::Allow);
        tree.set_decision("old", SubjectKind::Role, &path("/a/b"), read, Decision::Deny);
        tree.set_decision("new", SubjectKind::Role, &path("/a"), read, Decision::Deny);
        tree.set_decision("new", SubjectKind::Role, &path("/a"), write, Decision::Allow);

        assert_eq!(tree.rename_subject("old", "new", SubjectKind::Role), 2);
        assert!(allowed(&tree, "new", SubjectKind::Role, "/a"));
        assert!(!allowed(&tree, "new", SubjectKind::Role, "/a/b"));
        assert!(!allowed(&tree, "old", SubjectKind::Role, "/a"));
        assert_eq!(
            tree.decision_at("new", SubjectKind::Role, &path("/a"), write),
            Some(Decision::Allow)
        );
        assert_eq!(tree.rename_subject("same", "same", SubjectKind::Role), 0);
    }

    #[test]
    fn test_allowed_resources() {
        let ui = PermissionCategory::UI;
        let mut tree = PermissionTree::new();
        tree.set_decision("admin", SubjectKind::Role, &path("/permission/admin"), ui, Decision::Allow);
        tree.set_decision("admin", SubjectKind::Role, &path("/permission/admin/manage"), ui, Decision::Allow);
        tree.set_decision("admin", SubjectKind::Role, &path("/permission/admin/secret"), ui, Decision::Deny);
        tree.set_decision("bob", SubjectKind::User, &path("/permission/protected/x"), ui, Decision::Allow);
        tree.set_decision("other", SubjectKind::Role, &path("/permission/other"), ui, Decision::Allow);

        let roles = vec!["admin".to_string()];
        let all = tree.allowed_resources(&roles, Some("bob"), ui, &ResourcePath::root());
        assert_eq!(all, vec!["/permission/admin", "/permission/protected/x"]);

        let scoped = tree.allowed_resources(&roles, Some("bob"), ui, &path("/permission/protected"));
        assert_eq!(scoped, vec!["/permission/protected/x"]);

        let inherited = tree.allowed_resources(&roles, None, ui, &path("/permission/admin/manage"));
        assert_eq!(inherited, vec!["/permission/admin/manage"]);

        assert!(tree.allowed_resources(&roles, None, ui, &path("/nowhere")).is_empty());
        assert!(tree.allowed_resources(&[], None, ui, &ResourcePath::root()).is_empty());
    }

    #[test]
    fn test_clear_resets_tree() {
        let (read, _) = categories();
        let mut tree = PermissionTree::new();
        tree.set_decision("r", SubjectKind::Role, &path("/a/b"), read, Decision::Allow);
        tree.clear();
        assert!(tree.is_empty());
        assert!(!allowed(&tree, "r", SubjectKind::Role, "/a/b"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(usize, Vec<usize>, bool),
        Clear(usize, Vec<usize>),
    }

    const SUBJECTS: [&str; 3] = ["a", "b", "c"];
    const COMPONENTS: [&str; 3] = ["x", "y", "z"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        let subject = 0..SUBJECTS.len();
        let components = prop::collection::vec(0..COMPONENTS.len(), 0..4);
        prop_oneof![
            (subject.clone(), components.clone(), any::<bool>())
                .prop_map(|(s, p, allow)| Op::Set(s, p, allow)),
            (subject, components).prop_map(|(s, p)| Op::Clear(s, p)),
        ]
    }

    fn to_path(indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| COMPONENTS[i].to_string()).collect()
    }

    proptest! {
        #[test]
        fn point_query_matches_naive_model(
            ops in prop::collection::vec(op_strategy(), 0..40),
            subject in 0..SUBJECTS.len(),
            query in prop::collection::vec(0..COMPONENTS.len(), 0..5),
        ) {
            let read = PermissionCategory::new(1);
            let mut tree = PermissionTree::new();
            let mut model: HashMap<(usize, Vec<String>), Decision> = HashMap::new();

            for op in ops {
                match op {
                    Op::Set(s, p, allow) => {
                        let components = to_path(&p);
                        tree.set_decision(
                            SUBJECTS[s],
                            SubjectKind::Role,
                            &ResourcePath::from_components(components.clone()),
                            read,
                            Decision::from_allowed(allow),
                        );
                        model.insert((s, components), Decision::from_allowed(allow));
                    }
                    Op::Clear(s, p) => {
                        let components = to_path(&p);
                        tree.clear_decision(
                            SUBJECTS[s],
                            SubjectKind::Role,
                            &ResourcePath::from_components(components.clone()),
                            read,
                        );
                        model.remove(&(s, components));
                    }
                }
            }

            let query = to_path(&query);
            let expected = (0..=query.len())
                .rev()
                .find_map(|len| model.get(&(subject, query[..len].to_vec())))
                .copied();

            let result = tree.point_query(
                SUBJECTS[subject],
                SubjectKind::Role,
                read,
                &ResourcePath::from_components(query),
            );
            prop_assert_eq!(result.decision(), expected);

            // Every non-root node leads to at least one ruling.
            if model.is_empty() {
                prop_assert_eq!(tree.node_count(), 1);
            }
        }
    }
}
