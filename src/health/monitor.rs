//! Per-provider probe loop.
//!
//! # Responsibilities
//! - Probe one provider on its own interval
//! - Feed outcomes through the provider's tracker
//! - Publish status and forward transitions to the failover service
//!
//! # Design Decisions
//! - One task per provider: a hung probe never delays another provider
//! - The probe future is raced against shutdown, so shutdown never waits on it
//! - A manual re-check wakes every idle monitor for an immediate cycle

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::failover::{FailoverHandle, HealthChange};
use crate::health::observer::{HealthObserver, Outcome};
use crate::health::registry::{ObservationHistory, ProviderEntry};
use crate::health::state::{HealthTracker, Thresholds, Transition};
use crate::observability::metrics;

pub struct ProviderMonitor {
    observer: HealthObserver,
    tracker: HealthTracker,
    history: ObservationHistory,
    entry: Arc<ProviderEntry>,
    interval: Duration,
    failover: FailoverHandle,
    recheck: Arc<Notify>,
}

impl ProviderMonitor {
    pub fn new(
        observer: HealthObserver,
        entry: Arc<ProviderEntry>,
        config: &HealthCheckConfig,
        failover: FailoverHandle,
        recheck: Arc<Notify>,
    ) -> Self {
        Self {
            observer,
            tracker: HealthTracker::new(Thresholds::from(config)),
            history: ObservationHistory::new(config.history_size),
            entry,
            interval: config.probe_interval(),
            failover,
            recheck,
        }
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            provider = %self.observer.provider(),
            target = %self.observer.target(),
            interval_ms = self.interval.as_millis() as u64,
            "Provider monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
                _ = self.recheck.notified() => {
                    tracing::debug!(provider = %self.observer.provider(), "Manual re-check requested");
                }
            }

            let outcome = tokio::select! {
                _ = shutdown.recv() => break,
                outcome = self.observer.observe() => outcome,
            };

            if let Some(transition) = self.apply(outcome) {
                self.forward(transition).await;
            }
        }

        tracing::info!(provider = %self.observer.provider(), "Provider monitor stopped");
    }

    /// Feed one outcome through the tracker and publish the new status.
    pub fn apply(&mut self, outcome: Outcome) -> Option<Transition> {
        let provider = self.observer.provider();
        metrics::record_probe(provider, outcome.reachable, outcome.latency);

        if !outcome.reachable {
            tracing::warn!(
                provider = %provider,
                reason = outcome.reason.as_deref().unwrap_or("unknown"),
                consecutive_failures = self.tracker.consecutive_failures() + 1,
                "Provider unreachable"
            );
        }

        let transition = self.tracker.observe(outcome.reachable, outcome.observed_at);
        self.history.push(outcome);
        self.entry.publish(&self.tracker, &self.history);

        if let Some(t) = &transition {
            metrics::record_provider_health(provider, t.to);
            tracing::info!(provider = %provider, from = %t.from, to = %t.to, "Provider health changed");
        }
        transition
    }

    async fn forward(&self, transition: Transition) {
        let change = HealthChange {
            provider: self.observer.provider().to_string(),
            from: transition.from,
            to: transition.to,
            at: transition.at,
            failing_since: transition.failing_since,
        };
        if let Err(e) = self.failover.notify(change).await {
            tracing::warn!(provider = %self.observer.provider(), error = %e, "Dropped health change");
        }
    }
}
