//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pool/dispatcher → Spawn prober → Listen
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → prober exits, server drains
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
