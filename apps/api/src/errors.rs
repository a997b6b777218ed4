use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::MatchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream provider error: {0}")]
    BadGateway(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        let message = err.to_string();
        match err {
            MatchError::ScorecardNotFound(_) => AppError::NotFound(message),
            MatchError::NoEvidence => AppError::Validation(message),
            MatchError::EmbeddingProvider(_) => AppError::BadGateway(message),
            MatchError::Timeout(_) => AppError::Timeout(message),
            MatchError::Repository(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::BadGateway(msg) => {
                tracing::error!("Embedding provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_PROVIDER_ERROR",
                    "The embedding provider is unavailable".to_string(),
                )
            }
            AppError::Timeout(msg) => {
                tracing::warn!("Match timed out: {msg}");
                (StatusCode::GATEWAY_TIMEOUT, "MATCH_TIMEOUT", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
