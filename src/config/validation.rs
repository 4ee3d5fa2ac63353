//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate threshold ordering and probe timing
//! - Check provider names are unique and targets are probe-able
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FailoverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::FailoverConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("provider list is empty")]
    NoProviders,

    #[error("provider #{0} has an empty name")]
    EmptyProviderName(usize),

    #[error("provider '{0}' is listed more than once")]
    DuplicateProvider(String),

    #[error("provider '{name}' has invalid target '{target}': {reason}")]
    InvalidTarget {
        name: String,
        target: String,
        reason: String,
    },

    #[error("{0} must be at least 1")]
    ThresholdTooLow(&'static str),

    #[error("down_threshold ({down}) must be >= degrade_threshold ({degrade})")]
    DownBelowDegrade { down: u32, degrade: u32 },

    #[error("probe_interval_ms must be greater than 0")]
    ZeroInterval,

    #[error("probe_timeout_ms ({timeout}) must be greater than 0 and below probe_interval_ms ({interval})")]
    TimeoutNotBelowInterval { timeout: u64, interval: u64 },

    #[error("history_size must be at least 1")]
    EmptyHistory,

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &FailoverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_providers(config, &mut errors);

    let hc = &config.health_check;
    if hc.degrade_threshold < 1 {
        errors.push(ValidationError::ThresholdTooLow("degrade_threshold"));
    }
    if hc.recovery_threshold < 1 {
        errors.push(ValidationError::ThresholdTooLow("recovery_threshold"));
    }
    if hc.down_threshold < hc.degrade_threshold {
        errors.push(ValidationError::DownBelowDegrade {
            down: hc.down_threshold,
            degrade: hc.degrade_threshold,
        });
    } else if hc.down_threshold < 1 {
        errors.push(ValidationError::ThresholdTooLow("down_threshold"));
    }
    if hc.probe_interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if hc.probe_timeout_ms == 0 || hc.probe_timeout_ms >= hc.probe_interval_ms {
        errors.push(ValidationError::TimeoutNotBelowInterval {
            timeout: hc.probe_timeout_ms,
            interval: hc.probe_interval_ms,
        });
    }
    if hc.history_size == 0 {
        errors.push(ValidationError::EmptyHistory);
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_providers(config: &FailoverConfig, errors: &mut Vec<ValidationError>) {
    if config.providers.is_empty() {
        errors.push(ValidationError::NoProviders);
        return;
    }

    let mut seen = HashSet::new();
    for (idx, provider) in config.providers.iter().enumerate() {
        if provider.name.trim().is_empty() {
            errors.push(ValidationError::EmptyProviderName(idx));
        } else if !seen.insert(provider.name.as_str()) {
            errors.push(ValidationError::DuplicateProvider(provider.name.clone()));
        }

        if let Err(reason) = check_target(&provider.target) {
            errors.push(ValidationError::InvalidTarget {
                name: provider.name.clone(),
                target: provider.target.clone(),
                reason,
            });
        }
    }
}

/// Probe targets must be `http://host[:port]/...` or `tcp://host:port`.
fn check_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    match url.scheme() {
        "http" => Ok(()),
        "tcp" if url.port().is_some() => Ok(()),
        "tcp" => Err("tcp targets need an explicit port".to_string()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
