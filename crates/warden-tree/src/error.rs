//! Codec error types.

use thiserror::Error;

/// Errors produced while mapping actions onto permission categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The action is not part of the deployment's vocabulary.
    #[error("action '{action}' has no permission category")]
    InvalidAction {
        /// The rejected action name.
        action: String,
    },

    /// The vocabulary already holds the maximum number of categories.
    #[error("action vocabulary is full ({max} categories); cannot add '{action}'")]
    VocabularyFull {
        /// The action that did not fit.
        action: String,
        /// Maximum number of categories.
        max: usize,
    },
}

impl CodecError {
    /// Creates an invalid-action error.
    pub fn invalid_action(action: impl Into<String>) -> Self {
        Self::InvalidAction {
            action: action.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
