//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the pool, dispatcher and health prober from configuration
//! - Create the Axum router: status endpoints plus the proxy fallback
//! - Wire up middleware (request ID, tracing)
//! - Serve until the shutdown broadcast fires

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{BalancerConfig, ClusterConfig};
use crate::dispatch::{Dispatcher, HyperUpstream, Upstream};
use crate::health::HealthProber;
use crate::http::status;
use crate::load_balancer::{PoolError, ServerPool};
use crate::observability::MetricsCollector;
use crate::resilience::RetryPolicyError;

/// Errors raised while assembling the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid server pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid retry policy: {0}")]
    Retry(#[from] RetryPolicyError),
}

/// Application state injected into handlers.
pub struct AppState<U = HyperUpstream> {
    pub dispatcher: Arc<Dispatcher<U>>,
    pub cluster: ClusterConfig,
}

impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            cluster: self.cluster.clone(),
        }
    }
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BalancerConfig) -> Result<Self, ServerError> {
        let pool = Arc::new(ServerPool::from_config(&config.servers)?);
        let metrics = Arc::new(MetricsCollector::new());
        let dispatcher = Dispatcher::from_config(&config, pool.clone(), metrics, HyperUpstream::new())?;

        tracing::info!(
            servers = pool.len(),
            rate_limit_enabled = config.rate_limit.enabled,
            max_attempts = config.retries.max_attempts,
            "Dispatcher initialised"
        );

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            cluster: config.cluster.clone(),
        };

        Ok(Self {
            router: build_router(state),
            config,
            pool,
        })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            node_id = %self.config.cluster.node_id,
            "HTTP server starting"
        );

        let prober = HealthProber::new(self.pool.clone(), self.config.health_check.clone());
        let prober_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            prober.run(prober_shutdown).await;
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router<U: Upstream>(state: AppState<U>) -> Router {
    Router::new()
        .route("/health", get(status::health::<U>))
        .route("/metrics", get(status::metrics::<U>))
        .route("/servers", get(status::servers::<U>))
        .fallback(proxy_handler::<U>)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Proxy entry point: every path without a dedicated route.
async fn proxy_handler<U: Upstream>(
    State(state): State<AppState<U>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let client_key = peer.ip().to_string();
    let path = request.uri().path().to_string();

    match state.dispatcher.dispatch(&client_key, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(client = %client_key, path = %path, error = %e, "Request not proxied");
            e.into_response()
        }
    }
}
