//! Store error types.

use thiserror::Error;

/// Errors raised by a permission store.
///
/// Messages carry the failing operation and never connection credentials.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A store round trip exceeded its deadline.
    #[error("store operation timed out: {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
    },

    /// A write violated a store constraint.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// A role grant referenced a domain the tenant does not know.
    #[error("unknown domain '{domain}' for tenant {tenant}")]
    UnknownDomain {
        /// The missing domain name.
        domain: String,
        /// Tenant the lookup ran against.
        tenant: i32,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
