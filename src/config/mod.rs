//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the server pool is fixed for the
//!   process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BalancerConfig, CircuitBreakerConfig, ClusterConfig, HealthCheckConfig, LimitsConfig,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, RetryConfig, ServerConfig,
    TimeoutConfig,
};
