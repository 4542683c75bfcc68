//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → /health, /metrics, /servers → status.rs
//!     → anything else → dispatcher (admission, pool, proxy, retry)
//!     → backend response or synthesized error
//! ```

pub mod server;
pub mod status;

pub use server::{build_router, AppState, HttpServer, ServerError};
