//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client sliding window, keyed by peer IP)
//!     → circuit breaker / pool (only if admitted)
//! ```
//!
//! # Design Decisions
//! - Admission checks run before any backend work
//! - Fail closed: a rejected request never reaches the pool
//! - One lock over the whole client map; critical section is per-key work only

pub mod rate_limit;

pub use rate_limit::RateLimiter;
