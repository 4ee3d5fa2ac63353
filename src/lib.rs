//! Provider health tracking and failover decision engine.
//!
//! Probes an ordered list of interchangeable providers, classifies each as
//! up, degraded or down with hysteresis, and keeps exactly one of them
//! active. Every decision is appended to a durable event log that is
//! replayed on restart.

pub mod admin;
pub mod config;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::FailoverConfig;
pub use failover::{FailoverEvent, FailoverHandle, FailoverReason};
pub use health::HealthState;
pub use lifecycle::{Engine, Shutdown};
