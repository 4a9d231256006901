//! Hierarchical permission index for Warden.
//!
//! This crate holds the pure data structures behind authorization checks:
//!
//! - [`ResourcePath`] - a resource identifier split into path components
//! - [`ActionVocabulary`] / [`PermissionCategory`] - action names mapped to
//!   compact category indices
//! - [`PermissionTree`] - an arena-backed trie of allow/deny rulings per
//!   role and per user, with inherited, most-specific-wins resolution
//!
//! Nothing here locks or performs I/O; callers wrap the tree in whatever
//! synchronisation they need.
//!
//! # Example
//!
//! ```rust
//! use warden_core::{Decision, SubjectKind};
//! use warden_tree::{ActionVocabulary, PermissionTree, ResourcePath};
//!
//! let vocabulary = ActionVocabulary::default();
//! let view = vocabulary.category_of("read").unwrap();
//!
//! let mut tree = PermissionTree::new();
//! tree.set_decision("manager", SubjectKind::Role, &"/apps/billing".into(), view, Decision::Allow);
//! tree.set_decision("manager", SubjectKind::Role, &"/apps/billing/audit".into(), view, Decision::Deny);
//!
//! let reports = ResourcePath::parse("/apps/billing/reports");
//! assert!(tree.point_query("manager", SubjectKind::Role, view, &reports).last_node_allowed_access());
//!
//! let audit = ResourcePath::parse("/apps/billing/audit");
//! assert!(!tree.point_query("manager", SubjectKind::Role, view, &audit).last_node_allowed_access());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod category;
mod error;
mod node;
mod path;
mod search;
mod tree;

pub use category::{ActionVocabulary, PermissionCategory, DEFAULT_ACTIONS, MAX_CATEGORIES, UI_EXECUTE};
pub use error::{CodecError, CodecResult};
pub use node::{DecisionSet, Node, NodeId};
pub use path::{collapse_prefixes, ResourcePath, DELIMITER};
pub use search::SearchResult;
pub use tree::PermissionTree;

/// Splits a resource identifier into a [`ResourcePath`].
pub fn split(resource_id: &str) -> ResourcePath {
    ResourcePath::parse(resource_id)
}
