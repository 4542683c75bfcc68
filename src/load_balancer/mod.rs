//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: config servers → pool.rs (ordered backends, weight = slots)
//!
//! Per attempt:
//!     dispatcher → pool.next_server()
//!         → advance cursor, skip backends that are not alive
//!         → Arc<BackendServer> or None
//!
//! Health prober → backend.rs (per-server liveness lock)
//! ```
//!
//! # Design Decisions
//! - Backend list and cursor share one lock; liveness has its own per-server lock
//! - Backends are never removed at runtime
//! - Dead backends are excluded from selection, not from the pool

pub mod backend;
pub mod pool;

pub use backend::{BackendServer, ServerStatus, Transition};
pub use pool::{PoolError, ServerPool};
