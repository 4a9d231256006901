//! Action vocabulary and permission categories.
//!
//! Every action string a deployment understands maps onto a
//! [`PermissionCategory`], a small index that selects one bit in a node's
//! decision masks. The UI action is always category 0.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{CodecError, CodecResult};

/// The action used for UI (console) resources.
pub const UI_EXECUTE: &str = "ui.execute";

/// Maximum number of categories a vocabulary can hold.
pub const MAX_CATEGORIES: usize = 64;

/// Actions every vocabulary starts with.
pub const DEFAULT_ACTIONS: &[&str] = &[
    UI_EXECUTE,
    "read",
    "write",
    "delete",
    "add",
    "get",
    "edit",
    "browse",
    "authorize",
    "login",
    "execute",
    "subscribe",
    "publish",
];

/// Index of an action kind in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionCategory(u8);

impl PermissionCategory {
    /// Category of [`UI_EXECUTE`].
    pub const UI: Self = Self(0);

    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the category index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Bit selecting this category in a decision mask.
    pub(crate) const fn mask(self) -> u64 {
        1 << self.0
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mapping from action names to categories.
///
/// # Example
///
/// ```rust
/// use warden_tree::{ActionVocabulary, PermissionCategory};
///
/// let vocabulary = ActionVocabulary::default().with_action("approve").unwrap();
/// assert_eq!(vocabulary.category_of("UI.EXECUTE").unwrap(), PermissionCategory::UI);
/// assert!(vocabulary.category_of("approve").is_ok());
/// assert!(vocabulary.category_of("launch-missiles").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ActionVocabulary {
    actions: IndexMap<String, PermissionCategory>,
}

impl ActionVocabulary {
    /// Creates a vocabulary holding only the UI action.
    pub fn ui_only() -> Self {
        let mut actions = IndexMap::new();
        actions.insert(UI_EXECUTE.to_string(), PermissionCategory::UI);
        Self { actions }
    }

    /// Adds an action, returning the extended vocabulary.
    ///
    /// Adding an action that is already known is a no-op.
    pub fn with_action(mut self, action: &str) -> CodecResult<Self> {
        self.insert(action)?;
        Ok(self)
    }

    /// Adds several actions.
    pub fn with_actions<I, S>(mut self, actions: I) -> CodecResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for action in actions {
            self.insert(action.as_ref())?;
        }
        Ok(self)
    }

    fn insert(&mut self, action: &str) -> CodecResult<PermissionCategory> {
        let key = action.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(CodecError::invalid_action(action));
        }
        if let Some(category) = self.actions.get(&key) {
            return Ok(*category);
        }
        let next = self.actions.len();
        let index = u8::try_from(next)
            .ok()
            .filter(|_| next < MAX_CATEGORIES)
            .ok_or_else(|| CodecError::VocabularyFull {
                action: action.to_string(),
                max: MAX_CATEGORIES,
            })?;
        let category = PermissionCategory::new(index);
        self.actions.insert(key, category);
        Ok(category)
    }

    /// Maps an action onto its category, ignoring ASCII case.
    pub fn category_of(&self, action: &str) -> CodecResult<PermissionCategory> {
        let trimmed = action.trim();
        self.actions
            .get(trimmed)
            .or_else(|| self.actions.get(&trimmed.to_ascii_lowercase()))
            .copied()
            .ok_or_else(|| CodecError::invalid_action(action))
    }

    /// Returns the action name registered for `category`.
    pub fn action_name(&self, category: PermissionCategory) -> Option<&str> {
        self.actions
            .get_index(category.index())
            .map(|(name, _)| name.as_str())
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false; the UI action is always present.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterates over the registered action names in category order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl Default for ActionVocabulary {
    fn default() -> Self {
        let mut vocabulary = Self::ui_only();
        for action in DEFAULT_ACTIONS {
            // Defaults are distinct, non-empty and fewer than the maximum.
            let _ = vocabulary.insert(action);
        }
        vocabulary
    }
}
