//! Raw health probes.
//!
//! # Responsibilities
//! - Perform one outbound check against a provider's target
//! - Report success or a typed failure cause
//!
//! # Design Decisions
//! - Probes never apply their own timeout; the observer bounds them
//! - Target scheme selects the implementation (`http://`, `tcp://`)
//! - `SimulatedProbe` lets tests and drills flip a provider's health by hand

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hyper::Uri;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use url::Url;

/// Why a probe reported the provider unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("non-success status: {0}")]
    Status(u16),

    #[error("invalid probe target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// A single health check against one provider.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    /// The configured check target, for logs and state export.
    fn target(&self) -> &str;

    /// Run one check. `Ok(())` means reachable.
    async fn check(&self) -> Result<(), ProbeError>;
}

/// Build the probe for a configured target.
pub fn probe_for_target(target: &str) -> Result<Arc<dyn Probe>, ProbeError> {
    let invalid = |reason: String| ProbeError::InvalidTarget {
        target: target.to_string(),
        reason,
    };
    let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" => Ok(Arc::new(HttpProbe::new(target)?)),
        "tcp" => {
            let host = url.host_str().ok_or_else(|| invalid("missing host".into()))?;
            let port = url.port().ok_or_else(|| invalid("missing port".into()))?;
            Ok(Arc::new(TcpProbe::new(target, format!("{}:{}", host, port))))
        }
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// HTTP GET probe; any 2xx status is healthy.
pub struct HttpProbe {
    target: String,
    uri: Uri,
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new(target: &str) -> Result<Self, ProbeError> {
        let uri = target
            .parse::<Uri>()
            .map_err(|e| ProbeError::InvalidTarget {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            target: target.to_string(),
            uri,
            client,
        })
    }
}

impl fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProbe").field("target", &self.target).finish()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn target(&self) -> &str {
        &self.target
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.uri.clone())
            .header("user-agent", "provider-failover-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(response.status().as_u16()))
        }
    }
}

/// TCP connect probe.
#[derive(Debug)]
pub struct TcpProbe {
    target: String,
    addr: String,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            addr: addr.into(),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn target(&self) -> &str {
        &self.target
    }

    async fn check(&self) -> Result<(), ProbeError> {
        TcpStream::connect(&self.addr)
            .await
            .map(drop)
            .map_err(|e| ProbeError::Connect(e.to_string()))
    }
}

/// Probe whose result is set by hand. Used for failover drills and tests.
#[derive(Debug)]
pub struct SimulatedProbe {
    target: String,
    healthy: AtomicBool,
    delay: Option<Duration>,
}

impl SimulatedProbe {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            healthy: AtomicBool::new(true),
            delay: None,
        }
    }

    /// Make every check take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    fn target(&self) -> &str {
        &self.target
    }

    async fn check(&self) -> Result<(), ProbeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_healthy() {
            Ok(())
        } else {
            Err(ProbeError::Connect("simulated outage".to_string()))
        }
    }
}
