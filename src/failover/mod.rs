//! Failover decision subsystem.
//!
//! # Data Flow
//! ```text
//! HealthChange / manual override
//!     → service.rs (single decision task, serialized queue)
//!     → controller.rs (candidate selection, sticky policy)
//!     → log.rs (append-only record, durable JSON lines)
//!     → event.rs (FailoverEvent, the audit entry)
//! ```
//!
//! # Design Decisions
//! - The active pointer is a cache of the log's last event
//! - No automatic failback: recovery only affects future candidate choice
//! - Event log failures never stall a decision

pub mod controller;
pub mod event;
pub mod log;
pub mod service;

pub use controller::{FailoverController, FailoverError, HealthChange, ProviderView};
pub use event::{FailoverEvent, FailoverReason};
pub use log::{EventLog, EventLogError, EventLogReader};
pub use service::{Command, ControllerSnapshot, FailoverHandle, FailoverService};
