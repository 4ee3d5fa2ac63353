//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Monitors, controller and event log produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Event log write failures surface as both an error log and a metric
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
