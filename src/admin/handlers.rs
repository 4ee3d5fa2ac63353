use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::failover::{FailoverError, FailoverEvent, FailoverReason};
use crate::health::ProviderStatus;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    /// `operational` while a provider is active, `outage` otherwise.
    pub status: &'static str,
    pub active: Option<String>,
    pub providers: usize,
    pub events_logged: usize,
    pub events_pending: usize,
    pub uptime_secs: i64,
}

#[derive(Serialize)]
pub struct ActiveProvider {
    pub active: Option<String>,
    /// When the pointer last moved, if it ever did.
    pub since: Option<DateTime<Utc>>,
    pub reason: Option<FailoverReason>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct FailoverRequest {
    pub target: Option<String>,
    /// Operator's reason, stored in the event detail.
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct Accepted {
    pub status: &'static str,
}

/// Error body shared by all handlers.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<FailoverError> for ApiError {
    fn from(e: FailoverError) -> Self {
        let status = match e {
            FailoverError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            FailoverError::TargetUnavailable { .. } => StatusCode::CONFLICT,
            FailoverError::ServiceStopped => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.handle.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if snapshot.active.is_some() { "operational" } else { "outage" },
        active: snapshot.active.clone(),
        providers: snapshot.providers.len(),
        events_logged: snapshot.events_logged,
        events_pending: snapshot.events_pending,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

pub async fn get_providers(State(state): State<AdminState>) -> Json<Vec<ProviderStatus>> {
    Json(
        state
            .registry
            .statuses()
            .iter()
            .map(|s| s.as_ref().clone())
            .collect(),
    )
}

pub async fn get_active(State(state): State<AdminState>) -> Json<ActiveProvider> {
    let last_switch = state
        .handle
        .events()
        .all()
        .into_iter()
        .rev()
        .find(FailoverEvent::is_switch);

    Json(ActiveProvider {
        active: state.handle.active(),
        since: last_switch.as_ref().map(|e| e.timestamp),
        reason: last_switch.map(|e| e.reason),
    })
}

pub async fn get_events(
    State(state): State<AdminState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<FailoverEvent>> {
    let events = state.handle.events();
    Json(match query.limit {
        Some(limit) => events.tail(limit),
        None => events.all(),
    })
}

/// Manual failover. An empty body picks the best alternative.
pub async fn post_failover(
    State(state): State<AdminState>,
    body: Bytes,
) -> Result<Json<FailoverEvent>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        FailoverRequest::default()
    } else {
        serde_json::from_slice::<FailoverRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?
    };

    tracing::info!(
        requested = ?request.target,
        note = ?request.reason,
        "Manual failover requested"
    );
    let event = state
        .handle
        .force_failover(request.target, request.reason)
        .await?;
    Ok(Json(event))
}

pub async fn post_recheck(State(state): State<AdminState>) -> (StatusCode, Json<Accepted>) {
    state.recheck.notify_waiters();
    tracing::info!("Manual re-check requested");
    (StatusCode::ACCEPTED, Json(Accepted { status: "accepted" }))
}
