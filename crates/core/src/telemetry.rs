use std::net::SocketAddr;

use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{get_optional_parsed, get_optional_var, hydrate_env_file, ConfigError};

pub const LOG_FILTER_VAR: &str = "WATT_LOG_FILTER";
pub const METRICS_ADDRESS_VAR: &str = "WATT_METRICS_ADDRESS";

const DEFAULT_LOG_FILTER: &str = "info";

static TELEMETRY: OnceCell<TelemetryGuard> = OnceCell::new();

/// Log filter and optional Prometheus listener for binaries built on watt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            metrics_address: None,
        }
    }
}

impl TelemetryConfig {
    /// Reads `WATT_LOG_FILTER` (default `info`) and `WATT_METRICS_ADDRESS`.
    /// A listener address that is not `ip:port` is rejected here rather than
    /// at install time.
    pub fn from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;
        let mut config = Self::default();
        if let Some(filter) = get_optional_var(LOG_FILTER_VAR) {
            config.log_filter = filter;
        }
        config.metrics_address = get_optional_parsed(METRICS_ADDRESS_VAR)?;
        Ok(config)
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<SocketAddr> {
        self.metrics_address
    }
}

/// Handle to the process-wide metrics recorder.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: PrometheusHandle,
}

impl TelemetryGuard {
    /// Current counters in Prometheus text format.
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }
}

/// Installs the tracing subscriber and the Prometheus recorder, then
/// describes the discovery, credential and endpoint counters. Only the first
/// successful call installs anything; later calls get the same guard back.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    TELEMETRY
        .get_or_try_init(|| {
            let env_filter = EnvFilter::try_new(config.log_filter())
                .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

            let mut builder = PrometheusBuilder::new();
            if let Some(address) = config.metrics_address() {
                builder = builder.with_http_listener(address);
            }
            let metrics = builder
                .install_recorder()
                .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
            describe_counters();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_target(true))
                .try_init()
                .map_err(|err| TelemetryError::Tracing(err.to_string()))?;

            Ok(TelemetryGuard { metrics })
        })
        .cloned()
}

fn describe_counters() {
    describe_counter!(
        "address_discovery_total",
        Unit::Count,
        "Local address searches by outcome: local_host, interface or none."
    );
    describe_counter!(
        "address_discovery_failures_total",
        Unit::Count,
        "Probe failures skipped during local address discovery, by stage."
    );
    describe_counter!(
        "credential_refresh_total",
        Unit::Count,
        "Credential provider fetches by result."
    );
    describe_counter!(
        "endpoint_overrides_registered_total",
        Unit::Count,
        "Endpoint override registrations, including replacements."
    );
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, sync::Mutex};

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn clear() {
        env::set_var(crate::config::SKIP_DOTENV_VAR, "1");
        env::remove_var(LOG_FILTER_VAR);
        env::remove_var(METRICS_ADDRESS_VAR);
    }

    #[test]
    fn telemetry_config_uses_defaults() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear();

        let cfg = TelemetryConfig::from_env().expect("defaults load");
        assert_eq!(cfg, TelemetryConfig::default());
        assert_eq!(cfg.log_filter(), "info");
        assert_eq!(cfg.metrics_address(), None);
    }

    #[test]
    fn telemetry_config_reads_env() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear();
        env::set_var(LOG_FILTER_VAR, "watt_core=debug");
        env::set_var(METRICS_ADDRESS_VAR, "127.0.0.1:9898");

        let cfg = TelemetryConfig::from_env().expect("config loads");
        assert_eq!(cfg.log_filter(), "watt_core=debug");
        assert_eq!(cfg.metrics_address(), Some(SocketAddr::from(([127, 0, 0, 1], 9898))));

        clear();
    }

    #[test]
    fn malformed_metrics_address_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear();
        env::set_var(METRICS_ADDRESS_VAR, "localhost");

        let err = TelemetryConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: METRICS_ADDRESS_VAR, .. }
        ));

        env::set_var(METRICS_ADDRESS_VAR, "  ");
        assert_eq!(TelemetryConfig::from_env().unwrap().metrics_address(), None);

        clear();
    }

    #[test]
    fn init_is_idempotent_and_exports_described_counters() {
        let config = TelemetryConfig::default();
        let first = init_telemetry(&config).expect("telemetry installs");
        let second = init_telemetry(&config).expect("second call reuses the install");

        metrics::counter!("address_discovery_total", "result" => "interface").increment(1);

        let rendered = second.render_metrics();
        assert!(rendered.contains("address_discovery_total"), "{rendered}");
        assert!(rendered.contains("Local address searches"), "{rendered}");
        assert!(first.render_metrics().contains("address_discovery_total"));
    }
}
