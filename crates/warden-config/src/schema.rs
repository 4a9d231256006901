//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Authorization engine configuration section.
///
/// # Example
///
/// ```
/// use warden_config::AuthorizationConfig;
///
/// let config = AuthorizationConfig::default();
/// assert!(config.cache_enabled);
/// assert!(!config.case_sensitive);
/// assert_eq!(config.tenant_id, -1234);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Tenant served by the engine.
    #[serde(default = "default_tenant_id")]
    pub tenant_id: i32,

    /// Memoize user authorization results.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Compare subject, resource and action names case-sensitively.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Check membership by listing all of a user's roles at once instead of
    /// asking role by role.
    #[serde(default)]
    pub verify_by_retrieving_all_user_roles: bool,

    /// Rely on the store's referential cascade when clearing a resource.
    #[serde(default)]
    pub cascade_delete_enabled: bool,

    /// Name under which the decision cache is registered.
    #[serde(default = "default_cache_identifier")]
    pub cache_identifier: String,

    /// Principal that is authorized for everything.
    #[serde(default = "default_system_user")]
    pub system_user: String,

    /// Deadline for a single store transaction, in milliseconds.
    #[serde(default)]
    pub store_timeout_ms: Option<u64>,

    /// Actions understood in addition to the built-in vocabulary.
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            cache_enabled: true,
            case_sensitive: false,
            verify_by_retrieving_all_user_roles: false,
            cascade_delete_enabled: false,
            cache_identifier: default_cache_identifier(),
            system_user: default_system_user(),
            store_timeout_ms: None,
            actions: Vec::new(),
        }
    }
}

fn default_tenant_id() -> i32 {
    -1234
}

fn default_cache_identifier() -> String {
    "default".to_string()
}

fn default_system_user() -> String {
    "warden.system.user".to_string()
}

/// Decision cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached decisions.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Time-to-live of a cached decision, in seconds. None keeps entries
    /// until they are invalidated or evicted.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: None,
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

/// Grants written when the engine starts.
///
/// Resource lists are comma-separated; blank items are ignored.
///
/// # Example
///
/// ```
/// use warden_config::BootstrapConfig;
///
/// let config = BootstrapConfig {
///     everyone_resources: "/permission/admin/login, /permission/admin/home".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.everyone_resource_list().len(), 2);
/// assert!(config.admin_resource_list().is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Role every authenticated user holds.
    #[serde(default = "default_everyone_role")]
    pub everyone_role: String,

    /// Administrative role.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,

    /// UI resources granted to the everyone role.
    #[serde(default)]
    pub everyone_resources: String,

    /// UI resources granted to the admin role.
    #[serde(default)]
    pub admin_resources: String,

    /// Domain of the primary user store; overrides what the role resolver
    /// reports.
    #[serde(default)]
    pub user_store_domain: Option<String>,

    /// Whether a read-only user store exposes its groups as roles;
    /// overrides what the role resolver reports.
    #[serde(default)]
    pub read_groups: Option<bool>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            everyone_role: default_everyone_role(),
            admin_role: default_admin_role(),
            everyone_resources: String::new(),
            admin_resources: String::new(),
            user_store_domain: None,
            read_groups: None,
        }
    }
}

impl BootstrapConfig {
    /// Resource ids granted to the everyone role.
    pub fn everyone_resource_list(&self) -> Vec<String> {
        split_list(&self.everyone_resources)
    }

    /// Resource ids granted to the admin role.
    pub fn admin_resource_list(&self) -> Vec<String> {
        split_list(&self.admin_resources)
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_everyone_role() -> String {
    "Internal/everyone".to_string()
}

fn default_admin_role() -> String {
    "admin".to_string()
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Number of committed changes retained per tenant for incremental sync.
    #[serde(default = "default_change_retention")]
    pub change_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            change_retention: default_change_retention(),
        }
    }
}

fn default_change_retention() -> usize {
    10_000
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install a Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus metrics endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_true() -> bool {
    true
}
