//! Status endpoints: `/health`, `/metrics`, `/servers`.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dispatch::Upstream;
use crate::http::server::AppState;
use crate::load_balancer::ServerStatus;
use crate::resilience::CircuitState;

/// Liveness of this process (not of the backends).
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub node_id: String,
    pub is_primary: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ClusterInfo {
    pub node_id: String,
    pub is_primary: bool,
}

#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub server_count: usize,
    pub healthy_servers: usize,
    pub average_latency_ms: f64,
    pub circuit_state: CircuitState,
    pub cluster_info: ClusterInfo,
}

pub async fn health<U: Upstream>(State(state): State<AppState<U>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        node_id: state.cluster.node_id.clone(),
        is_primary: state.cluster.is_primary,
        timestamp: Utc::now(),
    })
}

pub async fn metrics<U: Upstream>(State(state): State<AppState<U>>) -> Json<MetricsReport> {
    let dispatcher = &state.dispatcher;
    let snapshot = dispatcher.metrics().snapshot();
    let pool = dispatcher.pool();

    Json(MetricsReport {
        total_requests: snapshot.total_requests,
        successful_requests: snapshot.successful_requests,
        failed_requests: snapshot.failed_requests,
        server_count: pool.len(),
        healthy_servers: pool.healthy_server_count(),
        average_latency_ms: snapshot.average_latency_ms,
        circuit_state: dispatcher.breaker().state(),
        cluster_info: ClusterInfo {
            node_id: state.cluster.node_id.clone(),
            is_primary: state.cluster.is_primary,
        },
    })
}

pub async fn servers<U: Upstream>(State(state): State<AppState<U>>) -> Json<Vec<ServerStatus>> {
    Json(state.dispatcher.pool().servers())
}
