//! Per-request orchestration.
//!
//! # Pipeline
//! ```text
//! rate limiter ──reject──▶ 429 (no pool, no breaker)
//!      │
//! circuit breaker ──open──▶ 503 (no pool)
//!      │
//! buffer body
//!      │
//! for attempt in 0..max_attempts:
//!     backoff (attempt > 0)
//!     pool.next_server() ──none──▶ next attempt
//!     proxy with per-attempt timeout
//!         ok   → breaker.record_success, metrics(success), return response
//!         fail → breaker.record_failure, metrics(failure), next attempt
//!      │
//! exhausted ──▶ 503 carrying the last upstream error
//! ```
//!
//! Bookkeeping for an attempt happens only after the attempt completes. A
//! dropped request future (client disconnect) therefore never records a
//! partial attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tokio::time;

use crate::config::BalancerConfig;
use crate::dispatch::error::{DispatchError, UpstreamError};
use crate::dispatch::upstream::{build_request, target_uri, Upstream};
use crate::load_balancer::ServerPool;
use crate::observability::metrics::{self, MetricsCollector};
use crate::resilience::{CircuitBreaker, RetryPolicy, RetryPolicyError};
use crate::security::RateLimiter;

/// Composes admission control, selection, proxying and retry.
#[derive(Debug)]
pub struct Dispatcher<U> {
    pool: Arc<ServerPool>,
    limiter: Option<RateLimiter>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    metrics: Arc<MetricsCollector>,
    upstream: U,
    attempt_timeout: Duration,
    max_body_bytes: usize,
}

impl<U: Upstream> Dispatcher<U> {
    pub fn new(
        pool: Arc<ServerPool>,
        limiter: Option<RateLimiter>,
        breaker: CircuitBreaker,
        retry: RetryPolicy,
        metrics: Arc<MetricsCollector>,
        upstream: U,
    ) -> Self {
        Self {
            pool,
            limiter,
            breaker,
            retry,
            metrics,
            upstream,
            attempt_timeout: Duration::from_secs(30),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }

    /// Wire a dispatcher from configuration.
    pub fn from_config(
        config: &BalancerConfig,
        pool: Arc<ServerPool>,
        metrics: Arc<MetricsCollector>,
        upstream: U,
    ) -> Result<Self, RetryPolicyError> {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(&config.rate_limit));
        let breaker = CircuitBreaker::new(
            config.circuit_breaker.failure_threshold,
            config.circuit_breaker.open_timeout(),
        );
        let retry = RetryPolicy::from_config(&config.retries)?;

        Ok(Self::new(pool, limiter, breaker, retry, metrics, upstream)
            .with_attempt_timeout(config.timeouts.attempt())
            .with_max_body_bytes(config.limits.max_body_bytes))
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    /// Run one inbound request through the pipeline.
    ///
    /// `client_key` identifies the caller for rate limiting and is appended
    /// to `X-Forwarded-For`.
    pub async fn dispatch(
        &self,
        client_key: &str,
        request: Request<Body>,
    ) -> Result<Response<Body>, DispatchError> {
        let start = Instant::now();

        if let Some(limiter) = &self.limiter {
            if !limiter.allow(client_key) {
                tracing::warn!(client = %client_key, "Rate limit exceeded");
                metrics::record_rate_limited();
                self.metrics.record_request(Duration::ZERO, false);
                return Err(DispatchError::AdmissionRejected);
            }
        }

        if !self.breaker.is_allowed() {
            tracing::warn!(client = %client_key, "Circuit open, rejecting request");
            metrics::record_circuit_rejected();
            self.metrics.record_request(Duration::ZERO, false);
            return Err(DispatchError::CircuitOpen);
        }

        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_request(start.elapsed(), false);
                return Err(DispatchError::PayloadTooLarge(e.to_string()));
            }
        };

        let mut last_error: Option<UpstreamError> = None;
        let mut reached = 0;

        for attempt in 0..self.retry.max_attempts() {
            if attempt > 0 {
                let backoff = self.retry.next_interval(attempt as i32);
                tracing::debug!(attempt, delay = ?backoff, "Backing off before retry");
                time::sleep(backoff).await;
            }

            let Some(server) = self.pool.next_server() else {
                tracing::debug!(attempt, "No alive backend for attempt");
                continue;
            };

            let outgoing = target_uri(server.url(), &parts.uri)
                .and_then(|uri| {
                    build_request(&parts, uri, body.clone(), client_key).map_err(|e| e.to_string())
                });
            let outgoing = match outgoing {
                Ok(req) => req,
                Err(reason) => {
                    tracing::error!(server = %server.url(), reason = %reason, "Malformed backend URL");
                    self.metrics.record_request(start.elapsed(), false);
                    return Err(DispatchError::InvalidBackendUrl {
                        url: server.url().to_string(),
                        reason,
                    });
                }
            };

            tracing::debug!(server = %server.url(), attempt, path = %parts.uri.path(), "Routing request");
            reached += 1;

            match self.attempt(outgoing).await {
                Ok(response) => {
                    self.breaker.record_success();
                    self.metrics.record_request(start.elapsed(), true);
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(server = %server.url(), attempt, error = %e, "Upstream attempt failed");
                    self.breaker.record_failure();
                    self.metrics.record_request(start.elapsed(), false);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(DispatchError::RetriesExhausted { attempts: reached, last }),
            None => {
                self.metrics.record_request(start.elapsed(), false);
                Err(DispatchError::NoHealthyServer)
            }
        }
    }

    async fn attempt(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let response = match time::timeout(self.attempt_timeout, self.upstream.send(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(UpstreamError::Timeout(self.attempt_timeout)),
        };

        if is_gateway_failure(response.status()) {
            return Err(UpstreamError::Status(response.status()));
        }
        Ok(response)
    }
}

/// Statuses that mean the backend itself could not serve the request.
fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
