//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool, concurrently
//! - Apply each outcome to that backend's liveness only

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::HealthCheckConfig;
use crate::load_balancer::{BackendServer, ServerPool, Transition};
use crate::observability::metrics;

/// Why a probe did not count as a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    InvalidUrl(String),
    Connect(String),
    Status(u16),
    Timeout,
}

pub struct HealthProber {
    pool: Arc<ServerPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(pool: Arc<ServerPool>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            config,
            client,
        }
    }

    /// Probe on every interval until shutdown. The first round runs one full
    /// interval after start; backends begin alive.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        let interval = self.config.interval();
        tracing::info!(
            interval_secs = self.config.interval_secs,
            timeout_secs = self.config.timeout_secs,
            max_failures = self.config.max_failures,
            "Health prober starting"
        );

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        loop {
            // Shutdown is observed both between rounds and while probes are in flight
            tokio::select! {
                _ = async {
                    ticker.tick().await;
                    self.check_all().await;
                } => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once. Backends are probed concurrently and each
    /// result touches only its own server.
    pub async fn check_all(&self) {
        let backends = self.pool.backends();
        let probes = backends.iter().map(|backend| self.check_one(backend));
        join_all(probes).await;
    }

    async fn check_one(&self, backend: &Arc<BackendServer>) {
        let url = backend.url();
        let transition = match self.probe(url).await {
            Ok(()) => backend.record_probe_success(),
            Err(failure) => {
                tracing::debug!(server = %url, failure = ?failure, "Health probe failed");
                backend.record_probe_failure(self.config.max_failures)
            }
        };

        match transition {
            Transition::WentDown => {
                tracing::warn!(
                    server = %url,
                    failures = backend.consecutive_failures(),
                    "Backend marked down"
                );
                metrics::record_backend_alive(url, false);
            }
            Transition::CameUp => {
                tracing::info!(server = %url, "Backend marked alive");
                metrics::record_backend_alive(url, true);
            }
            Transition::Unchanged => {}
        }
    }

    /// GET the backend's base URL within the probe timeout. Only `200 OK`
    /// counts as healthy.
    async fn probe(&self, url: &str) -> Result<(), ProbeFailure> {
        let request = Request::builder()
            .method("GET")
            .uri(url)
            .header("user-agent", "dispatch-lb-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeFailure::InvalidUrl(e.to_string()))?;

        probe_with_timeout(self.client.request(request), self.config.timeout()).await
    }
}

async fn probe_with_timeout<F, B, E>(response: F, timeout: Duration) -> Result<(), ProbeFailure>
where
    F: std::future::Future<Output = Result<hyper::Response<B>, E>>,
    E: std::fmt::Display,
{
    match time::timeout(timeout, response).await {
        Ok(Ok(response)) if response.status() == StatusCode::OK => Ok(()),
        Ok(Ok(response)) => Err(ProbeFailure::Status(response.status().as_u16())),
        Ok(Err(e)) => Err(ProbeFailure::Connect(e.to_string())),
        Err(_) => Err(ProbeFailure::Timeout),
    }
}
