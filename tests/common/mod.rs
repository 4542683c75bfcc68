//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dispatch_lb::dispatch::{Upstream, UpstreamError};

/// Start a simple mock backend on an ephemeral port that returns a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// How a fake backend answers.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Respond(u16, &'static str),
    Refuse,
    Hang,
    /// Refuse the first `n` calls, then answer 200 with the given body.
    FailFirst(usize, &'static str),
}

/// In-memory transport keyed by backend authority (`host:port`).
#[derive(Debug, Clone, Default)]
pub struct FakeUpstream {
    behaviours: Arc<HashMap<String, Behaviour>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    pub fn new(behaviours: &[(&str, Behaviour)]) -> Self {
        let map = behaviours
            .iter()
            .map(|(authority, b)| (authority.to_string(), b.clone()))
            .collect();
        Self {
            behaviours: Arc::new(map),
            calls: Arc::default(),
        }
    }

    /// Authorities contacted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Upstream for FakeUpstream {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let authority = request
            .uri()
            .authority()
            .map(|a| a.to_string())
            .unwrap_or_default();

        let previous_calls = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|c| **c == authority).count();
            calls.push(authority.clone());
            previous
        };

        let behaviour = self
            .behaviours
            .get(&authority)
            .cloned()
            .unwrap_or(Behaviour::Refuse);

        match behaviour {
            Behaviour::Respond(status, body) => Ok(Response::builder()
                .status(status)
                .body(Body::from(body))
                .unwrap()),
            Behaviour::Refuse => Err(UpstreamError::Connect("connection refused".into())),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::FailFirst(n, body) => {
                if previous_calls < n {
                    Err(UpstreamError::Connect("connection refused".into()))
                } else {
                    Ok(Response::new(Body::from(body)))
                }
            }
        }
    }
}

/// Read a response body as UTF-8.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a balancer on an ephemeral port. Returns its address and the
/// shutdown handle that stops it.
pub async fn start_balancer(
    config: dispatch_lb::BalancerConfig,
) -> (SocketAddr, dispatch_lb::Shutdown) {
    let shutdown = dispatch_lb::Shutdown::new();
    let server = dispatch_lb::HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(200)).await;
    (addr, shutdown)
}
