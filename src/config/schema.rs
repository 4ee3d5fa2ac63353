//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the failover
//! engine. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the failover engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverConfig {
    /// Hysteresis thresholds and probe timing.
    pub health_check: HealthCheckConfig,

    /// Providers in priority order (first = most preferred).
    pub providers: Vec<ProviderConfig>,

    /// Durable event log settings.
    pub event_log: EventLogConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl FailoverConfig {
    /// Convenience constructor used by tests and embedders: default settings
    /// with the given `(name, target)` pairs as the provider list.
    pub fn with_providers<I, N, T>(providers: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            providers: providers
                .into_iter()
                .map(|(name, target)| ProviderConfig {
                    name: name.into(),
                    target: target.into(),
                })
                .collect(),
            ..Self::default()
        }
    }
}

/// A single provider entry. Its priority rank is its position in the list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Unique provider identifier.
    pub name: String,

    /// Check target, e.g. `http://10.0.0.1:8080/health` or `tcp://10.0.0.1:5432`.
    pub target: String,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Consecutive failures before an UP provider is declared DEGRADED.
    pub degrade_threshold: u32,

    /// Consecutive failures before a provider is declared DOWN.
    pub down_threshold: u32,

    /// Consecutive successes before a DEGRADED or DOWN provider is UP again.
    pub recovery_threshold: u32,

    /// Probe interval in milliseconds.
    pub probe_interval_ms: u64,

    /// Probe timeout in milliseconds. Must be below the interval.
    pub probe_timeout_ms: u64,

    /// Number of recent observations kept per provider for state export.
    pub history_size: usize,
}

impl HealthCheckConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            degrade_threshold: 1,
            down_threshold: 3,
            recovery_threshold: 2,
            probe_interval_ms: 10_000,
            probe_timeout_ms: 5_000,
            history_size: 10,
        }
    }
}

/// Event log persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// JSON-lines file holding the failover history. `None` keeps it in memory.
    pub path: Option<PathBuf>,

    /// Base delay for exponential backoff between failed-append retries.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between failed-append retries.
    pub retry_max_delay_ms: u64,

    /// Flush attempts made on shutdown before queued events are given up.
    pub flush_attempts: u32,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: None,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 10_000,
            flush_attempts: 5,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl AdminConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let hc = HealthCheckConfig::default();
        assert_eq!(hc.degrade_threshold, 1);
        assert_eq!(hc.down_threshold, 3);
        assert_eq!(hc.recovery_threshold, 2);
        assert!(hc.probe_timeout() < hc.probe_interval());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let raw = r#"
            [health_check]
            down_threshold = 5

            [[providers]]
            name = "aws"
            target = "http://127.0.0.1:9000/health"

            [observability]
            log_format = "json"
        "#;
        let config: FailoverConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.health_check.down_threshold, 5);
        assert_eq!(config.health_check.recovery_threshold, 2);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.event_log.path.is_none());
    }
}
