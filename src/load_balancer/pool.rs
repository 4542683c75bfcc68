//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered set of backends (insertion order is rotation order)
//! - Rotate through alive backends with a shared cursor
//! - Provide snapshots for health probing and reporting
//!
//! # Rotation
//! Selection is "advance-then-read": each step moves the cursor forward by
//! one and inspects the server it lands on. With the cursor starting at 0 and
//! N alive servers, the first call returns index `1 % N`, then `2 % N`, and so
//! on. The order is deterministic and tests rely on it.

use std::sync::{Arc, Mutex};
use thiserror::Error;
use crate::config::ServerConfig;
use crate::load_balancer::backend::{BackendServer, ServerStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("backend url must not be empty")]
    EmptyUrl,
}

#[derive(Debug, Default)]
struct PoolInner {
    /// Distinct backends, in insertion order.
    backends: Vec<Arc<BackendServer>>,
    /// Rotation slots. A weighted backend appears once per unit of weight.
    slots: Vec<Arc<BackendServer>>,
    cursor: usize,
}

/// Ordered set of backends with round-robin selection.
#[derive(Debug, Default)]
pub struct ServerPool {
    inner: Mutex<PoolInner>,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from configuration. A server with weight `w` occupies
    /// `w` consecutive rotation slots but is a single backend.
    pub fn from_config(configs: &[ServerConfig]) -> Result<Self, PoolError> {
        let pool = Self::new();
        for config in configs {
            pool.add_weighted_server(&config.url, config.weight)?;
        }
        Ok(pool)
    }

    /// Append a new alive backend. Duplicates are permitted.
    pub fn add_server(&self, url: &str) -> Result<Arc<BackendServer>, PoolError> {
        self.add_weighted_server(url, 1)
    }

    /// Append a new alive backend occupying `weight` rotation slots.
    pub fn add_weighted_server(
        &self,
        url: &str,
        weight: u32,
    ) -> Result<Arc<BackendServer>, PoolError> {
        if url.trim().is_empty() {
            return Err(PoolError::EmptyUrl);
        }

        let server = Arc::new(BackendServer::new(url));
        let mut inner = self.lock();
        inner.backends.push(server.clone());
        for _ in 0..weight.max(1) {
            inner.slots.push(server.clone());
        }
        tracing::debug!(url = %url, weight, "Backend added to pool");
        Ok(server)
    }

    /// Select the next alive backend in rotation order.
    ///
    /// Scans at most `len()` positions; returns `None` when the pool is empty
    /// or no server is alive.
    pub fn next_server(&self) -> Option<Arc<BackendServer>> {
        let mut inner = self.lock();
        let len = inner.slots.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len {
            inner.cursor = (inner.cursor + 1) % len;
            let server = &inner.slots[inner.cursor];
            if server.is_alive() {
                return Some(server.clone());
            }
        }

        tracing::debug!(backend_count = len, "No alive backends in pool");
        None
    }

    /// Read-only snapshot of every backend, in insertion order.
    pub fn servers(&self) -> Vec<ServerStatus> {
        self.backends().iter().map(|s| s.status()).collect()
    }

    /// Handles to every distinct backend (for health probing). The pool lock
    /// is released before the caller touches any server.
    pub fn backends(&self) -> Vec<Arc<BackendServer>> {
        self.lock().backends.clone()
    }

    pub fn healthy_server_count(&self) -> usize {
        self.backends().iter().filter(|s| s.is_alive()).count()
    }

    /// Number of distinct backends.
    pub fn len(&self) -> usize {
        self.lock().backends.len()
    }

    /// Number of rotation slots (sum of weights).
    pub fn slot_count(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().expect("server pool mutex poisoned")
    }
}
