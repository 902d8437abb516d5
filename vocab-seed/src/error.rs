//! Error types for the trigger API
//!
//! Every error is rendered as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vocab_common::auth::AuthError;

use crate::services::SeedError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Seed lease held by another job (409)
    #[error("Seed lock is held by {owner}")]
    Locked { owner: String },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// vocab-common error, status chosen by kind
    #[error("{0}")]
    Common(vocab_common::Error),
}

impl From<vocab_common::Error> for ApiError {
    fn from(err: vocab_common::Error) -> Self {
        match err {
            vocab_common::Error::Locked { owner, .. } => ApiError::Locked { owner },
            other => ApiError::Common(other),
        }
    }
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::Config(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(ref err) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string()),
            ApiError::Locked { ref owner } => (
                StatusCode::CONFLICT,
                "LOCKED",
                format!("A seeding job is already running (lease owner {})", owner),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => {
                let (status, code) = match err {
                    vocab_common::Error::InvalidInput(_)
                    | vocab_common::Error::UnsupportedLanguage(_)
                    | vocab_common::Error::UnsupportedLanguagePair(_, _) => {
                        (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                    }
                    vocab_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
                };
                (status, code, err.to_string())
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
