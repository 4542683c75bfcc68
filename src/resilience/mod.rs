//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the rate limiter:
//!     → circuit_breaker.rs (fail fast while the pool is tripped)
//!     → dispatcher attempt loop, bounded by retries.rs
//!     → each completed attempt reports back to circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Every backend call has a deadline (per-attempt timeout in the dispatcher)
//! - One breaker for the whole pool, guarded by a single lock
//! - Backoff is computed, never randomised, so retry timing is reproducible

pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retries::{RetryPolicy, RetryPolicyError};
