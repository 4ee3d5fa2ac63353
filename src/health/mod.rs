//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Provider monitor (monitor.rs), one task per provider:
//!     Periodic timer or manual re-check
//!     → observer.rs (probe.rs call bounded by timeout)
//!     → Outcome { reachable, latency }
//!     → state.rs tracker (hysteresis)
//!     → registry.rs (published status)
//!     → failover service (only on a state transition)
//!
//! State machine (state.rs):
//!     Up → Degraded → Down, Down/Degraded → Up
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Raw reachability is decoupled from declared health
//! - Trackers are owned by their monitor; no cross-provider locking
//! - Health state is per-provider, counters rebuilt from scratch on restart

pub mod monitor;
pub mod observer;
pub mod probe;
pub mod registry;
pub mod state;

pub use monitor::ProviderMonitor;
pub use observer::{HealthObserver, Outcome};
pub use probe::{probe_for_target, HttpProbe, Probe, ProbeError, SimulatedProbe, TcpProbe};
pub use registry::{ProviderRegistry, ProviderStatus};
pub use state::{HealthState, HealthTracker, Thresholds, Transition};
