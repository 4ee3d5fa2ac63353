//! Serialized decision path.
//!
//! # Data Flow
//! ```text
//! ProviderMonitor ──HealthChanged──┐
//!                                  ├─▶ mpsc queue ─▶ FailoverService (owns controller)
//! Admin API ──────ForceFailover────┘                     │
//!                                                        ├─▶ EventLog append
//!                                                        └─▶ ArcSwap<ControllerSnapshot>
//! ```
//!
//! # Design Decisions
//! - One task owns the controller; every mutation goes through its queue
//! - Readers load immutable snapshots, never a shared writable cell
//! - Failed durable appends are retried on an exponential backoff timer
//! - On shutdown the queue is drained and the log flushed before exit

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::EventLogConfig;
use crate::failover::controller::{FailoverController, FailoverError, HealthChange, ProviderView};
use crate::failover::event::FailoverEvent;
use crate::failover::log::EventLogReader;
use crate::resilience::backoff::calculate_backoff;

const QUEUE_CAPACITY: usize = 256;

/// Requests accepted by the decision task.
#[derive(Debug)]
pub enum Command {
    HealthChanged(HealthChange),
    ForceFailover {
        target: Option<String>,
        note: Option<String>,
        reply: oneshot::Sender<Result<FailoverEvent, FailoverError>>,
    },
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub active: Option<String>,
    pub providers: Vec<ProviderView>,
    pub events_logged: usize,
    pub events_pending: usize,
    pub updated_at: DateTime<Utc>,
}

impl ControllerSnapshot {
    fn capture(controller: &FailoverController) -> Self {
        Self {
            active: controller.active().map(String::from),
            providers: controller.providers().to_vec(),
            events_logged: controller.log().len(),
            events_pending: controller.log().pending(),
            updated_at: Utc::now(),
        }
    }
}

/// Cloneable client side of the decision task.
#[derive(Debug, Clone)]
pub struct FailoverHandle {
    tx: mpsc::Sender<Command>,
    snapshot: Arc<ArcSwap<ControllerSnapshot>>,
    events: EventLogReader,
}

impl FailoverHandle {
    /// Queue a health transition for the controller.
    pub async fn notify(&self, change: HealthChange) -> Result<(), FailoverError> {
        self.tx
            .send(Command::HealthChanged(change))
            .await
            .map_err(|_| FailoverError::ServiceStopped)
    }

    /// Manual override. A `None` target picks the best alternative; `note`
    /// is the operator's reason, recorded in the event detail.
    pub async fn force_failover(
        &self,
        target: Option<String>,
        note: Option<String>,
    ) -> Result<FailoverEvent, FailoverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::ForceFailover { target, note, reply })
            .await
            .map_err(|_| FailoverError::ServiceStopped)?;
        rx.await.map_err(|_| FailoverError::ServiceStopped)?
    }

    pub fn snapshot(&self) -> Arc<ControllerSnapshot> {
        self.snapshot.load_full()
    }

    /// Name of the provider currently receiving traffic.
    pub fn active(&self) -> Option<String> {
        self.snapshot.load().active.clone()
    }

    pub fn events(&self) -> &EventLogReader {
        &self.events
    }
}

/// The decision task.
pub struct FailoverService {
    controller: FailoverController,
    rx: mpsc::Receiver<Command>,
    snapshot: Arc<ArcSwap<ControllerSnapshot>>,
    config: EventLogConfig,
    retry_attempt: u32,
}

impl FailoverService {
    pub fn new(controller: FailoverController, config: EventLogConfig) -> (Self, FailoverHandle) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let snapshot = Arc::new(ArcSwap::from_pointee(ControllerSnapshot::capture(&controller)));
        let handle = FailoverHandle {
            tx,
            snapshot: snapshot.clone(),
            events: controller.log().reader(),
        };

        let service = Self {
            controller,
            rx,
            snapshot,
            config,
            retry_attempt: 0,
        };
        (service, handle)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(active = ?self.controller.active(), "Failover service starting");

        loop {
            let retry_delay = self.retry_delay();
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Failover service received shutdown signal, exiting loop");
                    break;
                }
                _ = tokio::time::sleep(retry_delay.unwrap_or_default()), if retry_delay.is_some() => {
                    self.retry_flush();
                }
            }
        }

        // Decisions already queued still count.
        while let Ok(cmd) = self.rx.try_recv() {
            self.handle(cmd);
        }
        self.flush_on_shutdown().await;
        tracing::info!(active = ?self.controller.active(), "Failover service stopped");
    }

    fn handle(&mut self, cmd: Command) {
        let now = Utc::now();
        match cmd {
            Command::HealthChanged(change) => {
                tracing::debug!(
                    provider = %change.provider,
                    from = %change.from,
                    to = %change.to,
                    "Processing health change"
                );
                self.controller.on_health_change(&change);
            }
            Command::ForceFailover { target, note, reply } => {
                let note = note.as_deref();
                let result = match target {
                    Some(name) => self.controller.force_failover_to(&name, note, now),
                    None => Ok(self.controller.force_failover(note, now)),
                };
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Manual failover rejected");
                }
                let _ = reply.send(result);
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.store(Arc::new(ControllerSnapshot::capture(&self.controller)));
    }

    fn retry_delay(&self) -> Option<Duration> {
        self.controller.log().has_pending().then(|| {
            calculate_backoff(
                self.retry_attempt + 1,
                self.config.retry_base_delay_ms,
                self.config.retry_max_delay_ms,
            )
        })
    }

    fn retry_flush(&mut self) {
        match self.controller.log_mut().flush() {
            Ok(()) => {
                tracing::info!(attempts = self.retry_attempt + 1, "Queued failover events persisted");
                self.retry_attempt = 0;
            }
            Err(e) => {
                self.retry_attempt = self.retry_attempt.saturating_add(1);
                tracing::error!(
                    error = %e,
                    attempt = self.retry_attempt,
                    pending = self.controller.log().pending(),
                    "Retrying event log write failed"
                );
            }
        }
        self.publish();
    }

    async fn flush_on_shutdown(&mut self) {
        for attempt in 1..=self.config.flush_attempts.max(1) {
            match self.controller.log_mut().flush() {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(error = %e, attempt, "Event log flush on shutdown failed");
                    tokio::time::sleep(calculate_backoff(
                        attempt,
                        self.config.retry_base_delay_ms,
                        self.config.retry_max_delay_ms,
                    ))
                    .await;
                }
            }
        }
        let lost = self.controller.log().pending();
        if lost > 0 {
            tracing::error!(pending = lost, "Shutting down with unpersisted failover events");
        }
    }
}
