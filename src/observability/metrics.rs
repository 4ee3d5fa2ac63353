//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define failover metrics (probe latency, health, decisions)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-provider and aggregate metrics
//!
//! # Metrics
//! - `failover_probe_latency_seconds` (histogram): probe latency by provider
//! - `failover_probe_failures_total` (counter): unreachable outcomes by provider
//! - `failover_provider_health` (gauge): 0=up, 1=degraded, 2=down
//! - `failover_active_provider` (gauge): 1 for the active provider, else 0
//! - `failover_events_total` (counter): logged decisions by reason
//! - `failover_event_log_write_failures_total` (counter): failed durable appends
//! - `failover_event_log_skipped_lines_total` (counter): malformed lines dropped on replay
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are provider name and event reason only

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::failover::FailoverReason;
use crate::health::HealthState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_probe(provider: &str, reachable: bool, latency: Duration) {
    histogram!("failover_probe_latency_seconds", "provider" => provider.to_string())
        .record(latency.as_secs_f64());
    if !reachable {
        counter!("failover_probe_failures_total", "provider" => provider.to_string()).increment(1);
    }
}

pub fn record_provider_health(provider: &str, state: HealthState) {
    let value = match state {
        HealthState::Up => 0.0,
        HealthState::Degraded => 1.0,
        HealthState::Down => 2.0,
    };
    gauge!("failover_provider_health", "provider" => provider.to_string()).set(value);
}

pub fn record_active_provider<'a>(providers: impl IntoIterator<Item = &'a str>, active: Option<&str>) {
    for provider in providers {
        let value = if Some(provider) == active { 1.0 } else { 0.0 };
        gauge!("failover_active_provider", "provider" => provider.to_string()).set(value);
    }
}

pub fn record_event(reason: FailoverReason) {
    counter!("failover_events_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_log_write_failure() {
    counter!("failover_event_log_write_failures_total").increment(1);
}

pub fn record_log_replay_skip() {
    counter!("failover_event_log_skipped_lines_total").increment(1);
}
