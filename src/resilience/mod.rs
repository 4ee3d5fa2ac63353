//! Resilience primitives.
//!
//! # Components
//! - backoff.rs: exponential backoff with jitter
//!
//! # Design Decisions
//! - Used by the failover service to retry durable event log writes
//! - Probe timeouts live in the health observer, not here
//! - Jitter is bounded (10%) so retry delays stay predictable

pub mod backoff;
