//! Provider health state machine.
//!
//! # States
//! - Up: provider is fully eligible for traffic
//! - Degraded: provider is failing but not yet declared down; still eligible
//! - Down: provider is excluded from candidate selection
//!
//! # State Transitions
//! ```text
//! Up       → Degraded: consecutive failures >= degrade_threshold
//! any      → Down:     consecutive failures >= down_threshold
//! Degraded → Up:       consecutive successes >= recovery_threshold
//! Down     → Up:       consecutive successes >= recovery_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping: a single blip never changes declared state
//! - A transition is reported only when the computed state differs
//! - Counters are never reset by a transition, only by the opposite outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::HealthCheckConfig;

/// Declared health of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Up,
    Degraded,
    Down,
}

impl HealthState {
    /// Up and Degraded providers may be selected as active.
    pub fn is_eligible(self) -> bool {
        self != HealthState::Down
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Up => "up",
            HealthState::Degraded => "degraded",
            HealthState::Down => "down",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hysteresis thresholds shared by every tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub degrade: u32,
    pub down: u32,
    pub recovery: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&HealthCheckConfig::default())
    }
}

impl From<&HealthCheckConfig> for Thresholds {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            degrade: config.degrade_threshold,
            down: config.down_threshold,
            recovery: config.recovery_threshold,
        }
    }
}

/// A change of declared health, emitted by [`HealthTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
    pub at: DateTime<Utc>,
    /// When the failure streak that caused this transition started.
    pub failing_since: Option<DateTime<Utc>>,
}

/// Per-provider hysteresis tracker.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    thresholds: Thresholds,
    state: HealthState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_observed: Option<DateTime<Utc>>,
    failing_since: Option<DateTime<Utc>>,
}

impl HealthTracker {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: HealthState::Up,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_observed: None,
            failing_since: None,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn last_observed(&self) -> Option<DateTime<Utc>> {
        self.last_observed
    }

    pub fn failing_since(&self) -> Option<DateTime<Utc>> {
        self.failing_since
    }

    /// Feed one normalized outcome. Returns the transition if the declared
    /// state changed.
    pub fn observe(&mut self, reachable: bool, at: DateTime<Utc>) -> Option<Transition> {
        self.last_observed = Some(at);
        let streak_start = self.failing_since;

        let next = if reachable {
            self.consecutive_successes = self.consecutive_successes.saturating_add(1);
            self.consecutive_failures = 0;
            self.failing_since = None;

            if self.state != HealthState::Up
                && self.consecutive_successes >= self.thresholds.recovery
            {
                HealthState::Up
            } else {
                self.state
            }
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            self.consecutive_successes = 0;
            self.failing_since.get_or_insert(at);

            if self.consecutive_failures >= self.thresholds.down {
                HealthState::Down
            } else if self.state == HealthState::Up
                && self.consecutive_failures >= self.thresholds.degrade
            {
                HealthState::Degraded
            } else {
                self.state
            }
        };

        if next == self.state {
            return None;
        }

        let transition = Transition {
            from: self.state,
            to: next,
            at,
            failing_since: if reachable { streak_start } else { self.failing_since },
        };
        self.state = next;
        Some(transition)
    }
}
