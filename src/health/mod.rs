//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (prober.rs)
//!     → snapshot pool backends (pool lock released)
//!     → probe every backend concurrently (GET base URL, bounded timeout)
//!     → update that backend's liveness under its own lock
//! ```
//!
//! # State Transitions
//! ```text
//! Alive → Down: consecutive failures >= max_failures
//! Down → Alive: one successful probe
//! ```
//!
//! # Design Decisions
//! - Probing never blocks the request path; the dispatcher only reads liveness
//! - Probe failures stay local; nothing is surfaced to callers
//! - Health state is per-backend, not per-pool

pub mod prober;

pub use prober::{HealthProber, ProbeFailure};
