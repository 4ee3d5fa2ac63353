//! Failover decision engine.
//!
//! # Responsibilities
//! - Own the active-provider pointer
//! - React to provider health changes and operator overrides
//! - Record every decision in the event log
//!
//! # Policy
//! ```text
//! active provider → Down      : switch to best candidate (or none)
//! other provider  → Up        : keep active, log recovery-noop (no failback)
//! active is none, any → Up    : promote best candidate (outage over)
//! force_failover              : best candidate other than active
//! ```
//!
//! # Design Decisions
//! - Candidates order: Up before Degraded, then priority rank
//! - The pointer changes only by appending an event (`commit`)
//! - Pure and synchronous; serialization is the caller's job (see service.rs)

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::failover::event::{FailoverEvent, FailoverReason};
use crate::failover::log::EventLog;
use crate::health::HealthState;
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{name}' is {state} and cannot become active")]
    TargetUnavailable { name: String, state: HealthState },

    #[error("failover service is not running")]
    ServiceStopped,
}

/// A health transition reported by a provider monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthChange {
    pub provider: String,
    pub from: HealthState,
    pub to: HealthState,
    pub at: DateTime<Utc>,
    /// Start of the failure streak behind a degrade/down transition.
    pub failing_since: Option<DateTime<Utc>>,
}

/// The controller's view of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderView {
    pub name: String,
    pub priority: usize,
    pub state: HealthState,
}

#[derive(Debug)]
pub struct FailoverController {
    providers: Vec<ProviderView>,
    active: Option<String>,
    outage_started: Option<DateTime<Utc>>,
    log: EventLog,
}

impl FailoverController {
    /// Build the controller from providers in priority order and a replayed
    /// log. The active pointer is whatever the log last recorded; an empty
    /// log starts on the most preferred provider.
    pub fn new(names: Vec<String>, log: EventLog, now: DateTime<Utc>) -> Self {
        let providers: Vec<ProviderView> = names
            .into_iter()
            .enumerate()
            .map(|(priority, name)| ProviderView {
                name,
                priority,
                state: HealthState::Up,
            })
            .collect();

        let last = log.last();
        let mut controller = Self {
            active: None,
            outage_started: None,
            providers,
            log,
        };

        match last {
            None => {
                controller.active = controller.providers.first().map(|p| p.name.clone());
                tracing::info!(active = ?controller.active, "Starting with empty event log");
            }
            Some(event) => match event.new_active {
                Some(name) if controller.view(&name).is_some() => {
                    tracing::info!(active = %name, sequence = event.sequence, "Restored active provider from event log");
                    controller.active = Some(name);
                }
                stale => {
                    // The log ended in an outage, or names a provider that is
                    // no longer configured. Every provider starts Up, so
                    // promote now rather than wait for a transition.
                    controller.active = stale.clone();
                    controller.outage_started = Some(event.timestamp);
                    let detail = match &stale {
                        Some(name) => format!("provider '{}' is no longer configured", name),
                        None => "restarted during total outage".to_string(),
                    };
                    controller.promote(now, detail);
                }
            },
        }

        metrics::record_active_provider(
            controller.providers.iter().map(|p| p.name.as_str()),
            controller.active(),
        );
        controller
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn providers(&self) -> &[ProviderView] {
        &self.providers
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Eligible providers, best first, optionally excluding one.
    pub fn candidates(&self, exclude: Option<&str>) -> Vec<&ProviderView> {
        let mut candidates: Vec<&ProviderView> = self
            .providers
            .iter()
            .filter(|p| p.state.is_eligible())
            .filter(|p| Some(p.name.as_str()) != exclude)
            .collect();
        candidates.sort_by_key(|p| (p.state != HealthState::Up, p.priority));
        candidates
    }

    /// Apply a provider's health transition. Returns the logged event, if
    /// the change warranted a decision.
    pub fn on_health_change(&mut self, change: &HealthChange) -> Option<FailoverEvent> {
        let Some(view) = self.providers.iter_mut().find(|p| p.name == change.provider) else {
            tracing::warn!(provider = %change.provider, "Health change for unknown provider ignored");
            return None;
        };
        view.state = change.to;

        let active = self.active.clone();
        let is_active = active.as_deref() == Some(change.provider.as_str());

        match (active, change.to) {
            (None, HealthState::Up | HealthState::Degraded) => Some(self.promote(
                change.at,
                format!("provider '{}' recovered from total outage", change.provider),
            )),
            (Some(_), HealthState::Down) if is_active => Some(self.fail_away(change)),
            (Some(active), HealthState::Up) if !is_active && change.from != HealthState::Up => {
                let event = FailoverEvent::new(
                    change.at,
                    Some(active.clone()),
                    Some(active.clone()),
                    FailoverReason::RecoveryNoop,
                )
                .with_detail(format!(
                    "provider '{}' recovered; staying on '{}'",
                    change.provider, active
                ));
                Some(self.commit(event))
            }
            _ => None,
        }
    }

    /// Switch to the best candidate other than the current active provider.
    /// Logs a no-op if there is no alternative. `note` is the operator's
    /// stated reason, kept in the event detail.
    pub fn force_failover(&mut self, note: Option<&str>, at: DateTime<Utc>) -> FailoverEvent {
        let previous = self.active.clone();
        let target = self
            .candidates(previous.as_deref())
            .first()
            .map(|p| p.name.clone());

        let (new_active, outcome) = match target {
            Some(name) => (Some(name), None),
            None => (previous.clone(), Some("no alternative candidate")),
        };
        let mut event = FailoverEvent::new(at, previous, new_active, FailoverReason::ManualOverride);
        event.detail = manual_detail(note, outcome);
        self.commit(event)
    }

    /// Switch to a named provider.
    pub fn force_failover_to(
        &mut self,
        target: &str,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<FailoverEvent, FailoverError> {
        let view = self
            .view(target)
            .ok_or_else(|| FailoverError::UnknownProvider(target.to_string()))?;
        if !view.state.is_eligible() {
            return Err(FailoverError::TargetUnavailable {
                name: target.to_string(),
                state: view.state,
            });
        }

        let previous = self.active.clone();
        let outcome = (previous.as_deref() == Some(target)).then_some("already active");
        let mut event = FailoverEvent::new(
            at,
            previous,
            Some(target.to_string()),
            FailoverReason::ManualOverride,
        );
        event.detail = manual_detail(note, outcome);
        Ok(self.commit(event))
    }

    fn view(&self, name: &str) -> Option<&ProviderView> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// The active provider went down.
    fn fail_away(&mut self, change: &HealthChange) -> FailoverEvent {
        let target = self
            .candidates(Some(&change.provider))
            .first()
            .map(|p| p.name.clone());
        let outage = change
            .failing_since
            .and_then(|since| (change.at - since).to_std().ok());

        let event = FailoverEvent::new(
            change.at,
            Some(change.provider.clone()),
            target,
            FailoverReason::HealthDegradation,
        )
        .with_outage(outage);
        self.commit(event)
    }

    /// Leave a total outage (or a stale pointer) for the best candidate.
    fn promote(&mut self, at: DateTime<Utc>, detail: String) -> FailoverEvent {
        let target = self.candidates(None).first().map(|p| p.name.clone());
        let outage = self
            .outage_started
            .and_then(|since| (at - since).to_std().ok());

        let event = FailoverEvent::new(
            at,
            self.active.clone(),
            target,
            FailoverReason::HealthDegradation,
        )
        .with_outage(outage)
        .with_detail(detail);
        self.commit(event)
    }

    /// Append the event and move the pointer to what it records.
    fn commit(&mut self, event: FailoverEvent) -> FailoverEvent {
        let event = self.log.append(event);

        if event.new_active.is_none() {
            self.outage_started.get_or_insert(event.timestamp);
        } else {
            self.outage_started = None;
        }
        self.active = event.new_active.clone();

        metrics::record_event(event.reason);
        metrics::record_active_provider(
            self.providers.iter().map(|p| p.name.as_str()),
            self.active.as_deref(),
        );

        if event.is_switch() {
            tracing::warn!(
                sequence = event.sequence,
                previous = ?event.previous,
                new_active = ?event.new_active,
                reason = %event.reason,
                outage_ms = ?event.outage_ms,
                "Active provider changed"
            );
        } else {
            tracing::info!(
                sequence = event.sequence,
                active = ?event.new_active,
                reason = %event.reason,
                detail = ?event.detail,
                "Failover decision left active provider unchanged"
            );
        }
        event
    }
}

/// Operator note first, then what the controller made of the request.
fn manual_detail(note: Option<&str>, outcome: Option<&str>) -> Option<String> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    match (note, outcome) {
        (Some(note), Some(outcome)) => Some(format!("{}; {}", note, outcome)),
        (Some(note), None) => Some(note.to_string()),
        (None, Some(outcome)) => Some(outcome.to_string()),
        (None, None) => None,
    }
}
