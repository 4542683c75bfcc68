//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Reject backend entries that cannot be added to the pool
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use crate::config::schema::BalancerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("servers[{index}]: url must not be empty")]
    EmptyServerUrl { index: usize },

    #[error("servers[{index}]: weight must be at least 1")]
    ZeroWeight { index: usize },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("retries.multiplier must be a finite number >= 1.0 (got {0})")]
    InvalidMultiplier(String),

    #[error("retries.max_interval_ms ({max}) is smaller than retries.initial_interval_ms ({initial})")]
    BackoffBoundsInverted { initial: u64, max: u64 },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, server) in config.servers.iter().enumerate() {
        if server.url.trim().is_empty() {
            errors.push(ValidationError::EmptyServerUrl { index });
        }
        if server.weight == 0 {
            errors.push(ValidationError::ZeroWeight { index });
        }
    }

    let positive: [(&'static str, u64); 8] = [
        ("rate_limit.requests_per_window", config.rate_limit.requests_per_window as u64),
        ("rate_limit.window_ms", config.rate_limit.window_ms),
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("health_check.max_failures", config.health_check.max_failures as u64),
        ("circuit_breaker.failure_threshold", config.circuit_breaker.failure_threshold as u64),
        ("retries.max_attempts", config.retries.max_attempts as u64),
        ("timeouts.attempt_ms", config.timeouts.attempt_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    let retries = &config.retries;
    if !retries.multiplier.is_finite() || retries.multiplier < 1.0 {
        errors.push(ValidationError::InvalidMultiplier(retries.multiplier.to_string()));
    }
    if retries.max_interval_ms < retries.initial_interval_ms {
        errors.push(ValidationError::BackoffBoundsInverted {
            initial: retries.initial_interval_ms,
            max: retries.max_interval_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
