//! Error types for artpulse-feed
//!
//! Maps the common error taxonomy onto HTTP responses. Every error leaves the
//! service as a JSON envelope `{error, debug?}` so clients can always parse
//! the body, even for catastrophic failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API result type
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request field (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid or expired bearer token (401)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failure in a named pipeline stage (500)
    ///
    /// The stage name is surfaced in the debug payload so a client report can
    /// identify which batch sub-step failed.
    #[error("Store error in {stage}: {source}")]
    Store {
        stage: &'static str,
        source: artpulse_common::Error,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Common error, mapped by variant
    #[error(transparent)]
    Common(#[from] artpulse_common::Error),
}

impl ApiError {
    /// Wrap a persistence failure with the pipeline stage it occurred in
    pub fn store(stage: &'static str, source: artpulse_common::Error) -> Self {
        ApiError::Store { stage, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg }),
            ),
            ApiError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication failed", "debug": { "reason": msg } }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": msg }),
            ),
            ApiError::Store { stage, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": format!("Failed during {}", stage),
                    "debug": { "stage": stage, "cause": source.to_string() },
                }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "debug": { "cause": msg } }),
            ),
            ApiError::Common(err) => {
                let status = match &err {
                    artpulse_common::Error::Validation(_) => StatusCode::BAD_REQUEST,
                    artpulse_common::Error::Auth(_) => StatusCode::UNAUTHORIZED,
                    artpulse_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, json!({ "error": err.to_string() }))
            }
        };

        (status, Json(body)).into_response()
    }
}
