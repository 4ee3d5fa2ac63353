//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FailoverConfig (validated, immutable)
//!     → cloned into monitors, controller, admin API
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; providers are a static ordered list
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any validation error is fatal at startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, EventLogConfig, FailoverConfig, HealthCheckConfig, LogFormat,
    ObservabilityConfig, ProviderConfig,
};
pub use validation::{validate_config, ValidationError};
