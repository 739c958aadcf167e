//! Error types and handling
//!
//! Every failure the topology core can surface is an [`AppError`]. Handlers
//! return it directly and it is converted to a consistent JSON response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested node or key does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A Consul call or node agent call failed (502)
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A payload could not be decoded into the expected shape (502)
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Catalog answers that contradict each other (502)
    #[error("Inconsistent backend state: {0}")]
    Inconsistent(String),

    /// The operation was cancelled or ran past its deadline (503)
    #[error("Cancelled: {0}")]
    Cancelled(String),


    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Prefix the message with what was being attempted, keeping the kind.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{}: {}", context, msg);
        match self {
            AppError::NotFound(m) => AppError::NotFound(wrap(m)),
            AppError::BadRequest(m) => AppError::BadRequest(wrap(m)),
            AppError::BackendUnavailable(m) => AppError::BackendUnavailable(wrap(m)),
            AppError::DecodeFailure(m) => AppError::DecodeFailure(wrap(m)),
            AppError::Inconsistent(m) => AppError::Inconsistent(wrap(m)),
            AppError::Cancelled(m) => AppError::Cancelled(wrap(m)),
            AppError::Internal(m) => AppError::Internal(wrap(m)),
        }
    }

    /// Stable identifier used in response bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::BackendUnavailable(_) => "backend_unavailable",
            AppError::DecodeFailure(_) => "decode_failure",
            AppError::Inconsistent(_) => "inconsistent_backend",
            AppError::Cancelled(_) => "cancelled",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, should_log) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, false),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, false),
            AppError::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, true),
            AppError::DecodeFailure(_) => (StatusCode::BAD_GATEWAY, true),
            AppError::Inconsistent(_) => (StatusCode::BAD_GATEWAY, true),
            AppError::Cancelled(_) => (StatusCode::SERVICE_UNAVAILABLE, true),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, true),
        };
        let error_type = self.kind();

        // Log server errors
        if should_log {
            error!(error = %self, error_type = error_type, "Request error");
        }

        let body = ErrorResponse::new(error_type, self.to_string());

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::BackendUnavailable(format!("request timed out: {}", err))
        } else if err.is_connect() {
            AppError::BackendUnavailable(format!("connection failed: {}", err))
        } else if err.is_decode() {
            AppError::DecodeFailure(err.to_string())
        } else {
            AppError::BackendUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DecodeFailure(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for the core and handlers
pub type AppResult<T> = Result<T, AppError>;
