//! Error types for the authorization crate.

use std::fmt;

use thiserror::Error;
use warden_store::StoreError;
use warden_tree::CodecError;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// What an operation was working on when it failed.
///
/// Rendered into error messages; carries names only, never credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Public operation name.
    pub operation: &'static str,
    /// Role or user name, if the operation has one.
    pub subject: Option<String>,
    /// Resource identifier, if the operation has one.
    pub resource: Option<String>,
    /// Action name, if the operation has one.
    pub action: Option<String>,
}

impl OperationContext {
    /// Creates a context with only the operation name.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            subject: None,
            resource: None,
            action: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the resource.
    #[must_use]
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the action.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation)?;
        let fields = [
            ("subject", &self.subject),
            ("resource", &self.resource),
            ("action", &self.action),
        ];
        let mut first = true;
        for (name, value) in fields {
            if let Some(value) = value {
                f.write_str(if first { " (" } else { ", " })?;
                write!(f, "{name}={value}")?;
                first = false;
            }
        }
        if !first {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Errors raised by the authorization manager.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// A required argument was missing or blank. Raised before any I/O.
    #[error("invalid input to {operation}: {message}")]
    InvalidInput {
        /// Operation that rejected the input.
        operation: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The action is not part of the deployment's vocabulary.
    #[error(transparent)]
    InvalidAction(#[from] CodecError),

    /// The store failed; any open transaction was rolled back.
    #[error("store failure in {context}: {source}")]
    Store {
        /// Where the failure happened.
        context: OperationContext,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Rolling back after a store failure failed as well. Store consistency
    /// is uncertain.
    #[error("rollback failed in {context}: {source} (after: {original})")]
    Rollback {
        /// Where the failure happened.
        context: OperationContext,
        /// Error raised by the rollback.
        #[source]
        source: StoreError,
        /// Error that triggered the rollback.
        original: StoreError,
    },

    /// The manager could not be built from its configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthzError {
    /// Creates an invalid input error.
    pub fn invalid_input(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            operation,
            message: message.into(),
        }
    }

    /// Creates a store error.
    pub fn store(context: OperationContext, source: StoreError) -> Self {
        Self::Store { context, source }
    }

    /// Creates a rollback error.
    pub fn rollback(context: OperationContext, source: StoreError, original: StoreError) -> Self {
        Self::Rollback {
            context,
            source,
            original,
        }
    }

    /// Check if this is an input validation error.
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::InvalidAction(_))
    }

    /// Check if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the operation context of a store or rollback failure.
    pub fn context(&self) -> Option<&OperationContext> {
        match self {
            Self::Store { context, .. } | Self::Rollback { context, .. } => Some(context),
            _ => None,
        }
    }
}
