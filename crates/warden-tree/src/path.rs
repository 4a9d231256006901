//! Resource path decomposition.
//!
//! Resource identifiers are slash-delimited strings
//! (`/permission/admin/manage`). Empty components are dropped, so
//! `/a//b/`, `a/b` and `/a/b` all decompose to `["a", "b"]`, and the empty
//! string and `/` both address the root.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

/// Delimiter between resource path components.
pub const DELIMITER: char = '/';

/// Number of components stored inline before spilling to the heap.
const INLINE_COMPONENTS: usize = 8;

/// An ordered sequence of path components.
///
/// # Example
///
/// ```rust
/// use warden_tree::ResourcePath;
///
/// let path = ResourcePath::parse("/apps/billing/reports");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.components().next(), Some("apps"));
/// assert!(path.starts_with(&ResourcePath::parse("/apps")));
/// assert_eq!(path.to_string(), "/apps/billing/reports");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourcePath {
    inner: SmallVec<[String; INLINE_COMPONENTS]>,
}

impl ResourcePath {
    /// Path of the root resource.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Splits a resource identifier into components.
    #[must_use]
    pub fn parse(resource_id: &str) -> Self {
        Self {
            inner: resource_id
                .split(DELIMITER)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Builds a path from already-split components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: components
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.is_empty())
                .collect(),
        }
    }

    /// Iterates over the components, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }

    /// Returns the component at `depth`.
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&str> {
        self.inner.get(depth).map(String::as_str)
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns true if `prefix` is this path or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &ResourcePath) -> bool {
        prefix.len() <= self.len() && self.inner[..prefix.len()] == prefix.inner[..]
    }

    /// Appends a component.
    pub fn push(&mut self, component: impl Into<String>) {
        let component = component.into();
        if !component.is_empty() {
            self.inner.push(component);
        }
    }
}

impl PartialOrd for ResourcePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourcePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner[..].cmp(&other.inner[..])
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.is_empty() {
            return f.write_str("/");
        }
        for component in &self.inner {
            write!(f, "{DELIMITER}{component}")?;
        }
        Ok(())
    }
}

impl From<&str> for ResourcePath {
    fn from(resource_id: &str) -> Self {
        Self::parse(resource_id)
    }
}

/// Drops every resource id that lies under another id in the set.
///
/// Ids are compared by path components, so `/a/bc` is not treated as a
/// descendant of `/a/b`. Duplicates collapse to one entry. The output is
/// sorted by path.
///
/// ```rust
/// use warden_tree::collapse_prefixes;
///
/// let ids = ["/a/b/c", "/a/b", "/a/bc", "/x"].map(String::from);
/// assert_eq!(collapse_prefixes(ids), vec!["/a/b", "/a/bc", "/x"]);
/// ```
pub fn collapse_prefixes<I>(resource_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed: Vec<(ResourcePath, String)> = resource_ids
        .into_iter()
        .map(|id| (ResourcePath::parse(&id), id))
        .collect();
    parsed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut kept: Vec<(ResourcePath, String)> = Vec::with_capacity(parsed.len());
    for (path, id) in parsed {
        // Descendants sort directly after their ancestor.
        if kept.last().is_some_and(|(last, _)| path.starts_with(last)) {
            continue;
        }
        kept.push((path, id));
    }
    kept.into_iter().map(|(_, id)| id).collect()
}
