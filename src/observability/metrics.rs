//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests by outcome and keep latency samples (`MetricsCollector`)
//! - Serve a JSON snapshot to `/metrics`
//! - Mirror events into the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `lb_requests_total` (counter): outcomes, labelled `outcome=success|failure`
//! - `lb_request_duration_seconds` (histogram): per-attempt latency
//! - `lb_backend_alive` (gauge): 1=alive, 0=down, labelled by server URL
//! - `lb_rate_limited_total` (counter): admission rejections
//! - `lb_circuit_rejected_total` (counter): requests refused by the breaker

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    latencies: Vec<Duration>,
}

/// Thread-safe request counters and latency history.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: Mutex<Counters>,
}

/// Point-in-time view of the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub latency_samples: usize,
    pub average_latency_ms: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed request (or attempt) and keep its latency.
    pub fn record_request(&self, duration: Duration, success: bool) {
        {
            let mut inner = self.lock();
            inner.total_requests += 1;
            if success {
                inner.successful_requests += 1;
            } else {
                inner.failed_requests += 1;
            }
            inner.latencies.push(duration);
        }

        let outcome = if success { "success" } else { "failure" };
        counter!("lb_requests_total", "outcome" => outcome).increment(1);
        histogram!("lb_request_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        let latency_samples = inner.latencies.len();
        let average_latency_ms = if latency_samples == 0 {
            0.0
        } else {
            let total: Duration = inner.latencies.iter().sum();
            total.as_secs_f64() * 1000.0 / latency_samples as f64
        };

        MetricsSnapshot {
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            latency_samples,
            average_latency_ms,
        }
    }

    /// Copy of every recorded latency, oldest first.
    pub fn latencies(&self) -> Vec<Duration> {
        self.lock().latencies.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.inner.lock().expect("metrics mutex poisoned")
    }
}

/// Record a backend liveness change.
pub fn record_backend_alive(url: &str, alive: bool) {
    gauge!("lb_backend_alive", "server" => url.to_string()).set(if alive { 1.0 } else { 0.0 });
}

/// Record a request refused by the rate limiter.
pub fn record_rate_limited() {
    counter!("lb_rate_limited_total").increment(1);
}

/// Record a request refused by the open circuit.
pub fn record_circuit_rejected() {
    counter!("lb_circuit_rejected_total").increment(1);
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_prometheus(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_by_outcome() {
        let m = MetricsCollector::new();
        m.record_request(Duration::from_millis(10), true);
        m.record_request(Duration::from_millis(30), false);
        m.record_request(Duration::ZERO, false);

        let snap = m.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.successful_requests, 1);
        assert_eq!(snap.failed_requests, 2);
        assert_eq!(snap.latency_samples, 3);
        assert!((snap.average_latency_ms - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.latencies()[1], Duration::from_millis(30));
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = MetricsCollector::new().snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.average_latency_ms, 0.0);
    }

    #[test]
    fn test_concurrent_recording() {
        let m = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_request(Duration::from_micros(5), i % 2 == 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = m.snapshot();
        assert_eq!(snap.total_requests, 800);
        assert_eq!(snap.successful_requests + snap.failed_requests, 800);
        assert_eq!(snap.successful_requests, 400);
    }
}
