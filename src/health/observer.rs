//! Health observer: turns a probe call into a normalized outcome.
//!
//! Every failure mode (timeout, refusal, bad status) collapses into
//! `reachable = false`. The cause survives only as a diagnostic string.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::health::probe::{Probe, ProbeError};

/// Normalized result of one observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub reachable: bool,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub observed_at: DateTime<Utc>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Wraps one provider's probe with the configured timeout.
#[derive(Debug, Clone)]
pub struct HealthObserver {
    provider: String,
    probe: Arc<dyn Probe>,
    timeout: Duration,
}

impl HealthObserver {
    pub fn new(provider: impl Into<String>, probe: Arc<dyn Probe>, timeout: Duration) -> Self {
        Self {
            provider: provider.into(),
            probe,
            timeout,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn target(&self) -> &str {
        self.probe.target()
    }

    /// Probe once. Never fails.
    pub async fn observe(&self) -> Outcome {
        let start = Instant::now();
        let result = match time::timeout(self.timeout, self.probe.check()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };
        let latency = start.elapsed();

        match result {
            Ok(()) => Outcome {
                reachable: true,
                latency,
                reason: None,
                observed_at: Utc::now(),
            },
            Err(e) => {
                tracing::debug!(
                    provider = %self.provider,
                    target = %self.probe.target(),
                    error = %e,
                    "Health probe failed"
                );
                Outcome {
                    reachable: false,
                    latency,
                    reason: Some(e.to_string()),
                    observed_at: Utc::now(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::SimulatedProbe;

    #[tokio::test]
    async fn test_reachable_outcome() {
        let probe = Arc::new(SimulatedProbe::new("sim://a"));
        let observer = HealthObserver::new("a", probe, Duration::from_secs(1));
        let outcome = observer.observe().await;
        assert!(outcome.reachable);
        assert!(outcome.reason.is_none());
    }

    #[tokio::test]
    async fn test_failure_collapses_to_unreachable() {
        let probe = Arc::new(SimulatedProbe::new("sim://a"));
        probe.set_healthy(false);
        let observer = HealthObserver::new("a", probe, Duration::from_secs(1));
        let outcome = observer.observe().await;
        assert!(!outcome.reachable);
        assert!(outcome.reason.unwrap().contains("simulated outage"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unreachable() {
        let probe = Arc::new(SimulatedProbe::new("sim://slow").with_delay(Duration::from_secs(30)));
        let observer = HealthObserver::new("slow", probe, Duration::from_millis(500));
        let outcome = observer.observe().await;
        assert!(!outcome.reachable);
        assert!(outcome.reason.unwrap().starts_with("timeout"));
        assert!(outcome.latency < Duration::from_secs(30));
    }

    #[test]
    fn test_outcome_serializes_latency_in_millis() {
        let outcome = Outcome {
            reachable: true,
            latency: Duration::from_millis(42),
            reason: None,
            observed_at: Utc::now(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["latency_ms"], 42);
        assert!(json.get("reason").is_none());
    }
}
