//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Replay event log → Decision task → Monitors → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Monitors stop (in-flight probes abandoned)
//!             → Decision queue drained → Event log flushed → Admin API closed
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Engine::shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{Engine, StartupError};
