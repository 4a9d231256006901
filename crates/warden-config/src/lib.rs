//! Typed configuration for the Warden authorization engine.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use warden_config::ConfigLoader;
//!
//! # fn main() -> Result<(), warden_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("warden.toml")?
//!     .with_env_prefix("WARDEN")
//!     .load()?;
//!
//! println!("cache enabled: {}", config.authorization.cache_enabled);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [authorization]
//! tenant_id = -1234
//! cache_enabled = true
//! case_sensitive = false
//! verify_by_retrieving_all_user_roles = false
//! cascade_delete_enabled = false
//! cache_identifier = "default"
//! store_timeout_ms = 5000
//! actions = ["approve"]
//!
//! [cache]
//! max_entries = 10000
//! ttl_secs = 900
//!
//! [bootstrap]
//! everyone_role = "Internal/everyone"
//! admin_role = "admin"
//! everyone_resources = "/permission/admin/login"
//! admin_resources = "/permission"
//!
//! [store]
//! change_retention = 10000
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `WARDEN__AUTHORIZATION__CACHE_ENABLED=false`
//! - `WARDEN__BOOTSTRAP__ADMIN_RESOURCES=/permission,/permission/admin`
//! - `WARDEN__TELEMETRY__LOGGING__LEVEL=debug`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
