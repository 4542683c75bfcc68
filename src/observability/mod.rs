//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (collector snapshot + metrics facade)
//!
//! Consumers:
//!     → stdout log stream
//!     → GET /metrics (JSON snapshot)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layer into every log line
//! - Counters live only in memory; they reset on restart

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsCollector, MetricsSnapshot};
