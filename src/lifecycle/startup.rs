//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build one probe per provider
//! - Replay the event log and restore the active provider
//! - Spawn the decision task, the provider monitors and the admin API
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is left running
//! - The decision task starts before any monitor can report to it
//! - The admin listener binds last, once the engine can answer requests

use chrono::Utc;
use futures_util::future::join_all;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::config::{validate_config, FailoverConfig, ValidationError};
use crate::failover::{EventLog, EventLogError, FailoverController, FailoverHandle, FailoverService};
use crate::health::{probe_for_target, HealthObserver, Probe, ProbeError, ProviderMonitor, ProviderRegistry};
use crate::lifecycle::Shutdown;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to open event log: {0}")]
    EventLog(#[from] EventLogError),

    #[error("failed to build probe: {0}")]
    Probe(#[from] ProbeError),

    #[error("expected {expected} probes, got {actual}")]
    ProbeCount { expected: usize, actual: usize },

    #[error("failed to bind admin API on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A running engine: monitors, decision task and optional admin API.
pub struct Engine {
    shutdown: Shutdown,
    handle: FailoverHandle,
    registry: Arc<ProviderRegistry>,
    recheck: Arc<Notify>,
    monitors: Vec<JoinHandle<()>>,
    service: JoinHandle<()>,
    admin: Option<(SocketAddr, JoinHandle<std::io::Result<()>>)>,
}

impl Engine {
    /// Start with probes built from each provider's target URL.
    pub async fn start(config: FailoverConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Validation)?;
        let probes = config
            .providers
            .iter()
            .map(|p| probe_for_target(&p.target))
            .collect::<Result<Vec<_>, _>>()?;
        Self::start_with_probes(config, probes).await
    }

    /// Start with caller-supplied probes, one per provider in config order.
    pub async fn start_with_probes(
        config: FailoverConfig,
        probes: Vec<Arc<dyn Probe>>,
    ) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Validation)?;
        if probes.len() != config.providers.len() {
            return Err(StartupError::ProbeCount {
                expected: config.providers.len(),
                actual: probes.len(),
            });
        }

        let log = EventLog::from_config(&config.event_log)?;
        tracing::info!(
            path = ?log.path(),
            replayed = log.len(),
            "Event log opened"
        );

        // Bind before spawning anything so a bad address leaves nothing behind.
        let listener = if config.admin.enabled {
            let listener = TcpListener::bind(&config.admin.bind_address)
                .await
                .map_err(|source| StartupError::Bind {
                    address: config.admin.bind_address.clone(),
                    source,
                })?;
            Some(listener)
        } else {
            None
        };

        let registry = Arc::new(ProviderRegistry::new(&config.providers));
        let controller = FailoverController::new(registry.names(), log, Utc::now());
        let (service, handle) = FailoverService::new(controller, config.event_log.clone());

        let shutdown = Shutdown::new();
        let recheck = Arc::new(Notify::new());
        let service = tokio::spawn(service.run(shutdown.subscribe()));

        let monitors = registry
            .entries()
            .iter()
            .zip(probes)
            .map(|(entry, probe)| {
                let observer = HealthObserver::new(entry.name(), probe, config.health_check.probe_timeout());
                let monitor = ProviderMonitor::new(
                    observer,
                    entry.clone(),
                    &config.health_check,
                    handle.clone(),
                    recheck.clone(),
                );
                tokio::spawn(monitor.run(shutdown.subscribe()))
            })
            .collect();

        let admin = match listener {
            Some(listener) => {
                let addr = listener.local_addr().map_err(|source| StartupError::Bind {
                    address: config.admin.bind_address.clone(),
                    source,
                })?;
                let state = AdminState::new(
                    handle.clone(),
                    registry.clone(),
                    recheck.clone(),
                    &config.admin.api_key,
                );
                let app = admin::router(state, config.admin.request_timeout());
                let stop = shutdown.wait();
                let task = tokio::spawn(async move {
                    axum::serve(listener, app).with_graceful_shutdown(stop).await
                });
                tracing::info!(address = %addr, "Admin API listening");
                Some((addr, task))
            }
            None => None,
        };

        tracing::info!(
            providers = registry.entries().len(),
            active = ?handle.active(),
            "Failover engine started"
        );

        Ok(Self {
            shutdown,
            handle,
            registry,
            recheck,
            monitors,
            service,
            admin,
        })
    }

    pub fn handle(&self) -> &FailoverHandle {
        &self.handle
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Wake every monitor for an immediate probe cycle.
    pub fn recheck(&self) {
        self.recheck.notify_waiters();
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin.as_ref().map(|(addr, _)| *addr)
    }

    /// Stop monitors, drain the decision queue, flush the log, stop the API.
    pub async fn shutdown(self) {
        tracing::info!("Failover engine shutting down");
        self.shutdown.trigger();

        for result in join_all(self.monitors).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Provider monitor task failed");
            }
        }
        if let Err(e) = self.service.await {
            tracing::error!(error = %e, "Failover service task failed");
        }
        if let Some((_, task)) = self.admin {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Admin API stopped with error"),
                Err(e) => tracing::error!(error = %e, "Admin API task failed"),
            }
        }
        tracing::info!(active = ?self.handle.active(), "Failover engine stopped");
    }
}
