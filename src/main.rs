//! dispatch-lb
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    DISPATCH-LB                       │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐  │
//!   ─────────────────┼─▶│  rate    │──▶│ circuit  │──▶│  attempt loop    │  │
//!                    │  │ limiter  │   │ breaker  │   │  (retry policy)  │  │
//!                    │  └────┬─────┘   └────┬─────┘   └───────┬──────────┘  │
//!                    │       │429           │503              │            │
//!                    │       ▼              ▼                 ▼            │
//!                    │  ┌─────────────────────────┐   ┌──────────────────┐  │
//!   Client Response  │  │   metrics collector     │◀──│   server pool    │──┼──▶ Backends
//!   ◀────────────────┼──│                         │   │  (round robin)   │  │
//!                    │  └─────────────────────────┘   └────────▲─────────┘  │
//!                    │                                         │            │
//!                    │                                 ┌───────┴────────┐   │
//!                    │                                 │ health prober  │───┼──▶ probes
//!                    │                                 └────────────────┘   │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use dispatch_lb::config::{load_config, BalancerConfig};
use dispatch_lb::lifecycle::{signals, Shutdown};
use dispatch_lb::observability::{logging, metrics};
use dispatch_lb::HttpServer;

#[derive(Parser)]
#[command(name = "dispatch-lb")]
#[command(about = "HTTP load balancer with rate limiting, circuit breaking and retries", long_about = None)]
struct Cli {
    /// Path to a TOML or JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("dispatch-lb v{} starting", env!("CARGO_PKG_VERSION"));

    if config.servers.is_empty() {
        tracing::warn!("No backend servers configured; every request will receive 503");
    }

    if config.observability.prometheus_enabled {
        match config.observability.prometheus_address.parse() {
            Ok(addr) => metrics::init_prometheus(addr),
            Err(_) => tracing::error!(
                prometheus_address = %config.observability.prometheus_address,
                "Failed to parse Prometheus address"
            ),
        }
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        node_id = %config.cluster.node_id,
        "Load balancer listening"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
