//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server, identified by its URL
//! - Track liveness (alive flag, consecutive probe failures, last check time)
//! - Apply the probe outcome policy

use std::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mutable liveness fields, guarded by the per-server lock.
#[derive(Debug, Clone)]
struct Liveness {
    alive: bool,
    consecutive_failures: u32,
    last_checked_at: Option<DateTime<Utc>>,
}

/// A single backend server.
///
/// The pool owns servers behind `Arc`; liveness has its own lock so the
/// health prober can update one server without taking the pool lock.
#[derive(Debug)]
pub struct BackendServer {
    url: String,
    liveness: Mutex<Liveness>,
}

/// Outcome of applying a probe result, used for transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    WentDown,
    CameUp,
}

impl BackendServer {
    /// Create a new backend, initially alive with no recorded failures.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            liveness: Mutex::new(Liveness {
                alive: true,
                consecutive_failures: 0,
                last_checked_at: None,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_alive(&self) -> bool {
        self.lock().alive
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_checked_at
    }

    /// Report a successful probe: failures reset, server marked alive.
    pub fn record_probe_success(&self) -> Transition {
        let mut live = self.lock();
        let was_alive = live.alive;
        live.consecutive_failures = 0;
        live.alive = true;
        live.last_checked_at = Some(Utc::now());

        if was_alive {
            Transition::Unchanged
        } else {
            Transition::CameUp
        }
    }

    /// Report a failed probe. The server goes down once `max_failures`
    /// consecutive failures have been seen.
    pub fn record_probe_failure(&self, max_failures: u32) -> Transition {
        let mut live = self.lock();
        live.consecutive_failures = live.consecutive_failures.saturating_add(1);
        live.last_checked_at = Some(Utc::now());

        if live.alive && live.consecutive_failures >= max_failures {
            live.alive = false;
            Transition::WentDown
        } else {
            Transition::Unchanged
        }
    }

    /// Point-in-time copy for reporting.
    pub fn status(&self) -> ServerStatus {
        let live = self.lock().clone();
        ServerStatus {
            url: self.url.clone(),
            alive: live.alive,
            consecutive_failures: live.consecutive_failures,
            last_checked_at: live.last_checked_at,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Liveness> {
        self.liveness.lock().expect("backend liveness mutex poisoned")
    }
}

/// Read-only view of a backend, as exposed on `/servers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStatus {
    pub url: String,
    pub alive: bool,
    pub consecutive_failures: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_alive() {
        let b = BackendServer::new("http://127.0.0.1:5001");
        assert!(b.is_alive());
        assert_eq!(b.consecutive_failures(), 0);
        assert!(b.last_checked_at().is_none());
    }

    #[test]
    fn test_goes_down_after_max_failures() {
        let b = BackendServer::new("http://127.0.0.1:5001");

        assert_eq!(b.record_probe_failure(3), Transition::Unchanged);
        assert_eq!(b.record_probe_failure(3), Transition::Unchanged);
        assert!(b.is_alive());

        assert_eq!(b.record_probe_failure(3), Transition::WentDown);
        assert!(!b.is_alive());
        assert_eq!(b.consecutive_failures(), 3);

        // Further failures keep counting but do not re-trigger the transition
        assert_eq!(b.record_probe_failure(3), Transition::Unchanged);
        assert_eq!(b.consecutive_failures(), 4);
    }

    #[test]
    fn test_single_success_revives() {
        let b = BackendServer::new("http://127.0.0.1:5001");
        for _ in 0..3 {
            b.record_probe_failure(3);
        }
        assert!(!b.is_alive());

        assert_eq!(b.record_probe_success(), Transition::CameUp);
        assert!(b.is_alive());
        assert_eq!(b.consecutive_failures(), 0);
        assert!(b.last_checked_at().is_some());
    }

    #[test]
    fn test_success_resets_partial_failures() {
        let b = BackendServer::new("http://127.0.0.1:5001");
        b.record_probe_failure(3);
        b.record_probe_failure(3);
        assert_eq!(b.record_probe_success(), Transition::Unchanged);

        b.record_probe_failure(3);
        assert!(b.is_alive(), "count restarted after success");
    }
}
