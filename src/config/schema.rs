//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.
//! Unknown keys are rejected so a misspelt or foreign setting fails the load
//! instead of silently falling back to a default.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BalancerConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Backend server definitions, in rotation order.
    pub servers: Vec<ServerConfig>,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Node identity reported on `/health` and `/metrics`.
    pub cluster: ClusterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BalancerConfig {
    /// Socket address string the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.bind_host, self.listener.port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the backend (e.g., "http://127.0.0.1:5001").
    pub url: String,

    /// Number of rotation slots this server occupies (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl ServerConfig {
    /// A server with the default weight.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            weight: default_weight(),
        }
    }
}

fn default_weight() -> u32 {
    1
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub requests_per_window: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_ms: 1000,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Number of consecutive failures before marking a server down.
    pub max_failures: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 20,
            timeout_secs: 5,
            max_failures: 3,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Failures (while closed) before the circuit opens.
    pub failure_threshold: u32,

    /// How long the circuit stays open before admitting trial traffic.
    pub open_timeout_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_secs: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,

    /// Backoff before the first retry in milliseconds.
    pub initial_interval_ms: u64,

    /// Upper bound for any backoff in milliseconds.
    pub max_interval_ms: u64,

    /// Growth factor applied per retry.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 100,
            max_interval_ms: 2000,
            multiplier: 2.0,
        }
    }
}

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Deadline for a single proxy attempt in milliseconds.
    pub attempt_ms: u64,
}

impl TimeoutConfig {
    pub fn attempt(&self) -> Duration {
        Duration::from_millis(self.attempt_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { attempt_ms: 30_000 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum buffered request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Node identity. Membership and consensus are not implemented; these values
/// are only reported.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub node_id: String,
    pub is_primary: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            is_primary: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Expose a Prometheus scrape endpoint.
    pub prometheus_enabled: bool,

    /// Prometheus endpoint bind address.
    pub prometheus_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            prometheus_enabled: false,
            prometheus_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BalancerConfig::default();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.health_check.interval(), Duration::from_secs(20));
        assert_eq!(config.health_check.timeout(), Duration::from_secs(5));
        assert_eq!(config.health_check.max_failures, 3);
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.initial_interval_ms, 100);
        assert_eq!(config.retries.max_interval_ms, 2000);
        assert_eq!(config.retries.multiplier, 2.0);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BalancerConfig = toml::from_str(
            r#"
            [[servers]]
            url = "http://127.0.0.1:5001"

            [[servers]]
            url = "http://127.0.0.1:5002"
            weight = 2

            [rate_limit]
            requests_per_window = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].weight, 1);
        assert_eq!(config.servers[1].weight, 2);
        assert_eq!(config.rate_limit.requests_per_window, 5);
        assert_eq!(config.rate_limit.window_ms, 1000);
        assert_eq!(config.listener.port, 8080);
    }
}
