//! Retry policy.
//!
//! # Responsibilities
//! - Bound the number of attempts per request
//! - Compute exponential backoff between attempts
//!
//! The policy is a pure calculator; the dispatcher owns the retry loop and
//! the sleeping.

use std::time::Duration;
use thiserror::Error;
use crate::config::RetryConfig;

#[derive(Debug, Error, PartialEq)]
pub enum RetryPolicyError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,

    #[error("multiplier must be finite and >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    #[error("max_interval {max:?} is smaller than initial_interval {initial:?}")]
    InvertedBounds { initial: Duration, max: Duration },
}

/// Immutable retry/backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError::NoAttempts);
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(RetryPolicyError::InvalidMultiplier(multiplier));
        }
        if max_interval < initial_interval {
            return Err(RetryPolicyError::InvertedBounds {
                initial: initial_interval,
                max: max_interval,
            });
        }

        Ok(Self {
            max_attempts,
            initial_interval,
            max_interval,
            multiplier,
        })
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self, RetryPolicyError> {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_interval_ms),
            Duration::from_millis(config.max_interval_ms),
            config.multiplier,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff to wait before `attempt`.
    ///
    /// `attempt <= 0` yields the initial interval; otherwise
    /// `initial * multiplier^(attempt - 1)`, capped at the max interval.
    pub fn next_interval(&self, attempt: i32) -> Duration {
        if attempt <= 0 {
            return self.initial_interval;
        }

        let factor = self.multiplier.powi(attempt - 1);
        let nanos = self.initial_interval.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max_interval.as_nanos() as f64 {
            return self.max_interval;
        }
        Duration::from_nanos(nanos.round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}
