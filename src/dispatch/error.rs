//! Dispatch error taxonomy and its HTTP mapping.

use std::time::Duration;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure of a single proxy attempt. Absorbed by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Connect(String),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream returned {0}")]
    Status(StatusCode),
}

/// Terminal outcome of a request that was not proxied successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Client exceeded its rate limit. Never retried.
    #[error("Rate limit exceeded")]
    AdmissionRejected,

    /// Circuit breaker is open. Never retried within the request.
    #[error("Service temporarily unavailable")]
    CircuitOpen,

    /// No alive backend on any attempt.
    #[error("No healthy backend available")]
    NoHealthyServer,

    /// Every attempt that reached a backend failed.
    #[error("All attempts failed ({attempts} reached a backend): {last}")]
    RetriesExhausted { attempts: u32, last: UpstreamError },

    /// Backend URL from configuration cannot be turned into a request target.
    #[error("Invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    /// Request body could not be buffered (too large or unreadable).
    #[error("Request body rejected: {0}")]
    PayloadTooLarge(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::AdmissionRejected => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::CircuitOpen
            | DispatchError::NoHealthyServer
            | DispatchError::RetriesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::InvalidBackendUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
