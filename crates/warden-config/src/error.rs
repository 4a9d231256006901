//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;
use warden_tree::CodecError;

/// Errors raised while loading or validating a [`WardenConfig`](crate::WardenConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read configuration file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or a key the schema does not know.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a key the schema does not know.
    #[error("failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The rejected format or file name.
        format: String,
    },

    /// A `WARDEN__…` variable or `.env` entry could not be applied.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvVar {
        /// The environment variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A name the engine keys on is blank.
    #[error("{field} must not be blank")]
    BlankName {
        /// Configuration key.
        field: &'static str,
    },

    /// A size or deadline that must be positive is zero.
    #[error("{field} must be greater than zero")]
    ZeroLimit {
        /// Configuration key.
        field: &'static str,
    },

    /// `authorization.actions` cannot be turned into an action vocabulary.
    #[error("invalid authorization.actions: {0}")]
    Vocabulary(#[from] CodecError),

    /// A startup grant names a resource that is not an absolute path.
    #[error("{field} entry '{resource}' must start with '/'")]
    BootstrapResource {
        /// Configuration key of the list.
        field: &'static str,
        /// The offending list item.
        resource: String,
    },

    /// The metrics exporter address does not parse.
    #[error("invalid telemetry.metrics.addr '{addr}': {source}")]
    MetricsAddr {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a new unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a new environment variable error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Configuration key the error is about, when it concerns a single key.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::BlankName { field }
            | Self::ZeroLimit { field }
            | Self::BootstrapResource { field, .. } => Some(*field),
            Self::Vocabulary(_) => Some("authorization.actions"),
            Self::MetricsAddr { .. } => Some("telemetry.metrics.addr"),
            Self::EnvVar { var, .. } => Some(var.as_str()),
            _ => None,
        }
    }

    /// Returns true if the configuration source itself could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Toml(_) | Self::Json(_) | Self::UnsupportedFormat { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_the_key() {
        assert_eq!(
            ConfigError::ZeroLimit {
                field: "store.change_retention"
            }
            .field(),
            Some("store.change_retention")
        );
        assert_eq!(
            ConfigError::env_parse_error("WARDEN__CACHE__MAX_ENTRIES", "expected integer").field(),
            Some("WARDEN__CACHE__MAX_ENTRIES")
        );
        assert_eq!(ConfigError::file_not_found("/etc/warden.toml").field(), None);
    }

    #[test]
    fn test_vocabulary_error() {
        let err = ConfigError::from(CodecError::invalid_action(" "));
        assert_eq!(err.field(), Some("authorization.actions"));
        assert!(err.to_string().starts_with("invalid authorization.actions"));
    }

    #[test]
    fn test_bootstrap_resource_message() {
        let err = ConfigError::BootstrapResource {
            field: "bootstrap.admin_resources",
            resource: "permission/admin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "bootstrap.admin_resources entry 'permission/admin' must start with '/'"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConfigError::unsupported_format("yaml").is_parse_error());
        assert!(!ConfigError::BlankName {
            field: "bootstrap.admin_role"
        }
        .is_parse_error());
    }
}
