//! Error types for folio-timeline
//!
//! `LoaderError` is `Clone` because one fetch result is handed to every
//! caller waiting on the same cache key.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Timeline loader errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    /// Connection refused, DNS failure, body read failure
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Body was not valid JSON for the expected shape
    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// JSON parsed but is missing required structure
    #[error("{0}")]
    Validation(String),

    /// Caller supplied an unusable year or slug
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// All retry attempts failed
    #[error("Failed to fetch {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoaderError {
    /// Map a reqwest failure, keeping timeouts distinguishable
    pub(crate) fn from_reqwest(url: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LoaderError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }
        } else {
            LoaderError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LoaderError::Timeout { .. })
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Diagnostics API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream timeline host failed (502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] LoaderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream(LoaderError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Upstream(ref err) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
