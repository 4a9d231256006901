//! Main configuration types.
//!
//! This module provides the top-level [`WardenConfig`] struct and its builder.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use warden_tree::ActionVocabulary;

use crate::{
    AuthorizationConfig, BootstrapConfig, CacheConfig, ConfigError, StoreConfig,
    TelemetryConfigSection,
};

/// Complete Warden configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.cache.max_entries, 10_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Authorization engine settings.
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Decision cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Grants written at startup.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Telemetry configuration (logging, metrics).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl WardenConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::{CacheConfig, WardenConfig};
    ///
    /// let config = WardenConfig::builder()
    ///     .cache(CacheConfig {
    ///         max_entries: 500,
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.cache.max_entries, 500);
    /// ```
    #[must_use]
    pub fn builder() -> WardenConfigBuilder {
        WardenConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The cache identifier or system user is blank
    /// - The cache is enabled with a zero entry budget
    /// - A bootstrap role name is blank
    /// - The change log retains nothing
    /// - An extra action is blank or the vocabulary overflows
    /// - A startup grant resource is not an absolute path
    /// - Metrics are enabled with an invalid address
    pub fn validate(&self) -> Result<(), ConfigError> {
        let authorization = &self.authorization;

        for (field, name) in [
            ("authorization.cache_identifier", &authorization.cache_identifier),
            ("authorization.system_user", &authorization.system_user),
            ("bootstrap.everyone_role", &self.bootstrap.everyone_role),
            ("bootstrap.admin_role", &self.bootstrap.admin_role),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::BlankName { field });
            }
        }

        if authorization.store_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroLimit {
                field: "authorization.store_timeout_ms",
            });
        }
        if authorization.cache_enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "cache.max_entries",
            });
        }
        if self.store.change_retention == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "store.change_retention",
            });
        }

        ActionVocabulary::default().with_actions(&authorization.actions)?;

        for (field, resources) in [
            ("bootstrap.everyone_resources", self.bootstrap.everyone_resource_list()),
            ("bootstrap.admin_resources", self.bootstrap.admin_resource_list()),
        ] {
            if let Some(resource) = resources.into_iter().find(|r| !r.starts_with('/')) {
                return Err(ConfigError::BootstrapResource { field, resource });
            }
        }

        if self.telemetry.metrics.enabled {
            let addr = &self.telemetry.metrics.addr;
            addr.parse::<SocketAddr>()
                .map_err(|source| ConfigError::MetricsAddr {
                    addr: addr.clone(),
                    source,
                })?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored debug logs and a short cache TTL so hand-edited
    /// grants show up quickly.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::WardenConfig;
    ///
    /// let config = WardenConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = crate::LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;

        config.cache.ttl_secs = Some(30);

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs at info level and the Prometheus exporter enabled.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::WardenConfig;
    ///
    /// let config = WardenConfig::production();
    /// assert_eq!(config.telemetry.logging.format, warden_config::LogFormat::Json);
    /// assert!(config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = crate::LogFormat::Json;
        config.telemetry.logging.ansi_enabled = false;

        config.telemetry.metrics.enabled = true;

        config
    }
}

/// Builder for [`WardenConfig`].
#[derive(Debug, Default)]
pub struct WardenConfigBuilder {
    authorization: Option<AuthorizationConfig>,
    cache: Option<CacheConfig>,
    bootstrap: Option<BootstrapConfig>,
    store: Option<StoreConfig>,
    telemetry: Option<TelemetryConfigSection>,
}

impl WardenConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authorization configuration.
    #[must_use]
    pub fn authorization(mut self, authorization: AuthorizationConfig) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Set the cache configuration.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the bootstrap configuration.
    #[must_use]
    pub fn bootstrap(mut self, bootstrap: BootstrapConfig) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    /// Set the store configuration.
    #[must_use]
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> WardenConfig {
        WardenConfig {
            authorization: self.authorization.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
            bootstrap: self.bootstrap.unwrap_or_default(),
            store: self.store.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<WardenConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
