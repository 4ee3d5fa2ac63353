//! Failover event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Why a decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailoverReason {
    /// Active provider went down, or a total outage ended.
    HealthDegradation,
    /// Operator request.
    ManualOverride,
    /// A non-active provider recovered; the active provider was kept.
    RecoveryNoop,
}

impl FailoverReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailoverReason::HealthDegradation => "health-degradation",
            FailoverReason::ManualOverride => "manual-override",
            FailoverReason::RecoveryNoop => "recovery-noop",
        }
    }
}

impl fmt::Display for FailoverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverEvent {
    /// Position in the log, assigned on append (first event is 1).
    pub sequence: u64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub previous: Option<String>,
    pub new_active: Option<String>,
    pub reason: FailoverReason,
    /// Length of the outage that triggered the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outage_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailoverEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        previous: Option<String>,
        new_active: Option<String>,
        reason: FailoverReason,
    ) -> Self {
        Self {
            sequence: 0,
            id: Uuid::new_v4(),
            timestamp,
            previous,
            new_active,
            reason,
            outage_ms: None,
            detail: None,
        }
    }

    pub fn with_outage(mut self, outage: Option<Duration>) -> Self {
        self.outage_ms = outage.map(|d| d.as_millis() as u64);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// True if the active provider changed.
    pub fn is_switch(&self) -> bool {
        self.previous != self.new_active
    }

    pub fn outage(&self) -> Option<Duration> {
        self.outage_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_wire_format() {
        assert_eq!(
            serde_json::to_string(&FailoverReason::HealthDegradation).unwrap(),
            "\"health-degradation\""
        );
        let reason: FailoverReason = serde_json::from_str("\"recovery-noop\"").unwrap();
        assert_eq!(reason, FailoverReason::RecoveryNoop);
        assert_eq!(FailoverReason::ManualOverride.to_string(), "manual-override");
    }

    #[test]
    fn test_event_json_omits_empty_optionals() {
        let event = FailoverEvent::new(
            Utc::now(),
            Some("aws".into()),
            None,
            FailoverReason::HealthDegradation,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["previous"], "aws");
        assert!(json["new_active"].is_null());
        assert!(json.get("outage_ms").is_none());
        assert!(event.is_switch());
    }

    #[test]
    fn test_outage_round_trips_as_millis() {
        let event = FailoverEvent::new(Utc::now(), None, Some("gcp".into()), FailoverReason::HealthDegradation)
            .with_outage(Some(Duration::from_millis(1500)));
        assert_eq!(event.outage_ms, Some(1500));
        assert_eq!(event.outage(), Some(Duration::from_millis(1500)));
    }
}
