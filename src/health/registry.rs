//! Read-only provider status export.
//!
//! Each monitor publishes its provider's latest status after every
//! observation; readers (admin API, embedders) load lock-free snapshots.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::health::observer::Outcome;
use crate::health::state::{HealthState, HealthTracker};

/// Exported view of one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub priority: usize,
    pub target: String,
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_observed: Option<DateTime<Utc>>,
    pub failing_since: Option<DateTime<Utc>>,
    pub last_outcome: Option<Outcome>,
    /// Mean latency of reachable observations in `history`.
    pub average_latency_ms: Option<u64>,
    /// Share of `history` that was reachable, 0 to 100.
    pub availability_percent: Option<f64>,
    pub history: Vec<Outcome>,
}

impl ProviderStatus {
    fn initial(name: &str, priority: usize, target: &str) -> Self {
        Self {
            name: name.to_string(),
            priority,
            target: target.to_string(),
            state: HealthState::Up,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_observed: None,
            failing_since: None,
            last_outcome: None,
            average_latency_ms: None,
            availability_percent: None,
            history: Vec::new(),
        }
    }
}

/// Bounded ring of recent outcomes for one provider.
#[derive(Debug, Clone)]
pub struct ObservationHistory {
    capacity: usize,
    entries: VecDeque<Outcome>,
}

impl ObservationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn average_latency_ms(&self) -> Option<u64> {
        let reachable: Vec<u128> = self
            .entries
            .iter()
            .filter(|o| o.reachable)
            .map(|o| o.latency.as_millis())
            .collect();
        if reachable.is_empty() {
            return None;
        }
        Some((reachable.iter().sum::<u128>() / reachable.len() as u128) as u64)
    }

    pub fn availability_percent(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let reachable = self.entries.iter().filter(|o| o.reachable).count();
        Some(reachable as f64 * 100.0 / self.entries.len() as f64)
    }

    pub fn to_vec(&self) -> Vec<Outcome> {
        self.entries.iter().cloned().collect()
    }
}

/// One registry slot.
#[derive(Debug)]
pub struct ProviderEntry {
    name: String,
    priority: usize,
    target: String,
    status: ArcSwap<ProviderStatus>,
}

impl ProviderEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn status(&self) -> Arc<ProviderStatus> {
        self.status.load_full()
    }

    /// Publish the tracker's current state.
    pub fn publish(&self, tracker: &HealthTracker, history: &ObservationHistory) {
        let last_outcome = history.entries.back().cloned();
        self.status.store(Arc::new(ProviderStatus {
            name: self.name.clone(),
            priority: self.priority,
            target: self.target.clone(),
            state: tracker.state(),
            consecutive_failures: tracker.consecutive_failures(),
            consecutive_successes: tracker.consecutive_successes(),
            last_observed: tracker.last_observed(),
            failing_since: tracker.failing_since(),
            last_outcome,
            average_latency_ms: history.average_latency_ms(),
            availability_percent: history.availability_percent(),
            history: history.to_vec(),
        }));
    }
}

/// All providers in priority order.
#[derive(Debug)]
pub struct ProviderRegistry {
    entries: Vec<Arc<ProviderEntry>>,
}

impl ProviderRegistry {
    pub fn new(providers: &[ProviderConfig]) -> Self {
        let entries = providers
            .iter()
            .enumerate()
            .map(|(priority, p)| {
                Arc::new(ProviderEntry {
                    name: p.name.clone(),
                    priority,
                    target: p.target.clone(),
                    status: ArcSwap::from_pointee(ProviderStatus::initial(&p.name, priority, &p.target)),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Arc<ProviderEntry>] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ProviderEntry>> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn statuses(&self) -> Vec<Arc<ProviderStatus>> {
        self.entries.iter().map(|e| e.status()).collect()
    }
}
