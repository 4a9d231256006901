//! Prometheus metrics for the authorization engine.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `warden_authz_decisions_total` | Counter | `kind`, `allowed` | Authorization decisions |
//! | `warden_cache_lookups_total` | Counter | `result` | Decision cache lookups |
//! | `warden_tree_refresh_total` | Counter | `mode` | Permission tree synchronisations |
//! | `warden_store_failures_total` | Counter | `operation` | Failed store operations |
//! | `warden_write_duration_seconds` | Histogram | `operation` | Grant write latency |
//!
//! Recording functions are no-ops until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Authorization decision counter.
pub const DECISIONS_TOTAL: &str = "warden_authz_decisions_total";
/// Cache lookup counter.
pub const CACHE_LOOKUPS_TOTAL: &str = "warden_cache_lookups_total";
/// Tree refresh counter.
pub const TREE_REFRESH_TOTAL: &str = "warden_tree_refresh_total";
/// Store failure counter.
pub const STORE_FAILURES_TOTAL: &str = "warden_store_failures_total";
/// Write latency histogram.
pub const WRITE_DURATION_SECONDS: &str = "warden_write_duration_seconds";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,

    /// Address the exporter listens on.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

impl From<&warden_config::MetricsConfig> for MetricsConfig {
    fn from(config: &warden_config::MetricsConfig) -> Self {
        Self {
            enabled: config.enabled,
            addr: config.addr.clone(),
        }
    }
}

/// Installs the Prometheus exporter and registers metric descriptions.
///
/// The exporter runs on the ambient Tokio runtime when there is one.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed or the
/// listener cannot bind.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();

    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(DECISIONS_TOTAL, "Authorization decisions by subject kind and outcome");
    describe_counter!(CACHE_LOOKUPS_TOTAL, "Decision cache lookups by result");
    describe_counter!(TREE_REFRESH_TOTAL, "Permission tree synchronisations by mode");
    describe_counter!(STORE_FAILURES_TOTAL, "Failed store operations");
    describe_histogram!(WRITE_DURATION_SECONDS, "Grant write latency in seconds");
}

/// Records an authorization decision; `kind` is `"role"` or `"user"`.
pub fn record_decision(kind: &'static str, allowed: bool) {
    counter!(
        DECISIONS_TOTAL,
        "kind" => kind,
        "allowed" => if allowed { "true" } else { "false" }
    )
    .increment(1);
}

/// Records a decision cache lookup.
pub fn record_cache_lookup(hit: bool) {
    counter!(
        CACHE_LOOKUPS_TOTAL,
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// Records a tree synchronisation; `mode` is `"full"` or `"incremental"`.
pub fn record_tree_refresh(mode: &'static str) {
    counter!(TREE_REFRESH_TOTAL, "mode" => mode).increment(1);
}

/// Records a failed store operation.
pub fn record_store_failure(operation: &'static str) {
    counter!(STORE_FAILURES_TOTAL, "operation" => operation).increment(1);
}

/// Records how long a grant write took, rollback included.
pub fn record_write_duration(operation: &'static str, duration: Duration) {
    histogram!(WRITE_DURATION_SECONDS, "operation" => operation).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_decision("role", true);
        record_decision("user", false);
        record_cache_lookup(true);
        record_tree_refresh("incremental");
        record_store_failure("authorize_role");
        record_write_duration("authorize_role", Duration::from_millis(3));
    }
}
