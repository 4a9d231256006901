//! Observability for the Warden authorization engine.
//!
//! - **Logging**: structured JSON or pretty logs through `tracing-subscriber`
//! - **Metrics**: decision, cache, refresh and store counters via the
//!   `metrics` crate, optionally exported to Prometheus
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_config::WardenConfig;
//! use warden_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = WardenConfig::production();
//! init_telemetry(&TelemetryConfig::from(&config.telemetry))?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use self::metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl From<&warden_config::TelemetryConfigSection> for TelemetryConfig {
    fn from(section: &warden_config::TelemetryConfigSection) -> Self {
        Self {
            logging: LogConfig::from(&section.logging),
            metrics: MetricsConfig::from(&section.metrics),
        }
    }
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
