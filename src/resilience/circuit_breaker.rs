//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backends assumed down, requests fail fast
//! - Half-Open: trial traffic admitted to test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: first is_allowed() after open_timeout has elapsed
//! Half-Open → Closed: a trial request succeeds
//! Half-Open → Open: a trial request fails
//! ```
//!
//! Every failure refreshes `opened_at`, so failures that land while the
//! circuit is already open push the blackout window out.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Pool-wide circuit breaker shared by all in-flight requests.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    open_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            open_timeout,
        }
    }

    /// Whether a request may proceed. An open circuit whose timeout has
    /// elapsed moves to half-open here and admits the caller.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let expired = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() > self.open_timeout);
                if expired {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!("Circuit breaker half-open, admitting trial traffic");
                }
                expired
            }
        }
    }

    /// Record a failed attempt.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.opened_at = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.failure_count = 0;
                    tracing::warn!(
                        threshold = self.failure_threshold,
                        timeout = ?self.open_timeout,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                tracing::warn!("Trial request failed, circuit breaker re-opened");
            }
            CircuitState::Open => {}
        }
    }

    /// Record a successful attempt. Only closes a half-open circuit.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            tracing::info!("Circuit breaker closed");
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}
