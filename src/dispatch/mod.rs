//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler (client IP, request)
//!     → dispatcher.rs (admission, attempt loop, bookkeeping)
//!     → upstream.rs (URI rewrite, header rewrite, hyper client)
//!     → backend response or DispatchError (error.rs → status code)
//! ```
//!
//! # Design Decisions
//! - Admission checks gate before any pool interaction
//! - Each attempt reselects from the pool; the same backend may come back
//! - Transport errors, timeouts and 502/503/504 count as failed attempts

pub mod dispatcher;
pub mod error;
pub mod upstream;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, UpstreamError};
pub use upstream::{HyperUpstream, Upstream};
