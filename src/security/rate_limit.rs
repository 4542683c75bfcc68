//! Per-client sliding-window rate limiting.
//!
//! Each client key maps to the timestamps of its admitted requests inside the
//! trailing window. A check prunes that key's stale timestamps, then admits
//! the request only if fewer than `limit` remain. Other keys are left alone,
//! so pruning cost is proportional to the caller's own history.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use crate::config::RateLimitConfig;

/// Sliding-window limiter shared by all requests.
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            limit: limit as usize,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, config.window())
    }

    /// Admit or reject one request from `key`, recording it when admitted.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut requests = self.lock();
        let history = requests.entry(key.to_string()).or_default();

        Self::prune(history, now, self.window);

        if history.len() >= self.limit {
            return false;
        }
        history.push_back(now);
        true
    }

    /// Number of admitted requests for `key` still inside the window, as of
    /// the last check that touched the key.
    pub fn current_requests(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Number of client keys being tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn prune(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) >= window {
                history.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.requests.lock().expect("rate limiter mutex poisoned")
    }
}
