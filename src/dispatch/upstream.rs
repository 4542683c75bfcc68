//! Forwarding to a backend.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto the selected backend's base URL
//! - Strip hop-by-hop headers, append `X-Forwarded-For`
//! - Send the request over a pooled hyper client
//!
//! The `Upstream` trait is the seam between the dispatcher and the network;
//! tests substitute an in-memory implementation.

use std::future::Future;
use std::str::FromStr;
use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderName, HeaderValue, Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::dispatch::error::UpstreamError;

/// Transport used by the dispatcher for each attempt.
pub trait Upstream: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, UpstreamError>> + Send;
}

/// HTTP/1.1 client with connection pooling.
#[derive(Debug, Clone)]
pub struct HyperUpstream {
    client: Client<HttpConnector, Body>,
}

impl HyperUpstream {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl Upstream for HyperUpstream {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| UpstreamError::Connect(e.to_string()))?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Join the backend base URL with the inbound path and query.
///
/// `http://b:5001/api` + `/users?id=1` → `http://b:5001/api/users?id=1`.
///
/// Only `http` backends are accepted; the client has no TLS connector.
pub fn target_uri(base: &str, inbound: &Uri) -> Result<Uri, String> {
    let mut url = Url::parse(base).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }

    let path = format!("{}{}", url.path().trim_end_matches('/'), inbound.path());
    url.set_path(&path);
    url.set_query(inbound.query());

    Uri::from_str(url.as_str()).map_err(|e| e.to_string())
}

/// Build the outgoing request for one attempt.
pub fn build_request(
    parts: &Parts,
    uri: Uri,
    body: Bytes,
    client_addr: &str,
) -> Result<Request<Body>, axum::http::Error> {
    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if *name == header::HOST || *name == X_FORWARDED_FOR || is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let forwarded = match parts.headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, client_addr),
            None => client_addr.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    builder.body(Body::from(body))
}

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}
