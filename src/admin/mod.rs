//! Operator API.
//!
//! ```text
//! GET  /admin/status          engine summary
//! GET  /admin/providers       per-provider health, counters, recent history
//! GET  /admin/active          active provider and when it was chosen
//! GET  /admin/events?limit=N  most recent failover events, oldest first
//! POST /admin/failover        manual override, body {"target": "...", "reason": "..."} optional
//! POST /admin/recheck         probe every provider now
//! ```
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::failover::FailoverHandle;
use crate::health::ProviderRegistry;

#[derive(Clone)]
pub struct AdminState {
    pub handle: FailoverHandle,
    pub registry: Arc<ProviderRegistry>,
    pub recheck: Arc<Notify>,
    pub api_key: Arc<str>,
    pub started_at: DateTime<Utc>,
}

impl AdminState {
    pub fn new(
        handle: FailoverHandle,
        registry: Arc<ProviderRegistry>,
        recheck: Arc<Notify>,
        api_key: &str,
    ) -> Self {
        Self {
            handle,
            registry,
            recheck,
            api_key: Arc::from(api_key),
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AdminState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/providers", get(get_providers))
        .route("/admin/active", get(get_active))
        .route("/admin/events", get(get_events))
        .route("/admin/failover", post(post_failover))
        .route("/admin/recheck", post(post_recheck))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
