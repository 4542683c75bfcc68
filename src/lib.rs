//! HTTP load balancer with admission control.
//!
//! Inbound requests pass a per-client sliding-window rate limiter and a
//! pool-wide circuit breaker before a round-robin pick from the backend pool.
//! Failed attempts are retried with exponential backoff; a background prober
//! keeps backend liveness current.

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::BalancerConfig;
pub use dispatch::{DispatchError, Dispatcher};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
