use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

/// Request failure taxonomy. The ordering is part of the contract:
/// Unauthorized is checked before anything else, Validation before any
/// store access, and whatever escapes those two collapses to Internal at
/// the outer edge of the handler.
#[derive(Debug)]
pub enum AppError {
    /// No usable session. Always the fixed payload, no detail.
    Unauthorized,
    /// A required field is missing or malformed. The message is the fixed
    /// per-field contract string.
    Validation(&'static str),
    /// Anything unexpected, storage failures included. The cause is logged
    /// with context; the caller only ever sees the generic message.
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "unauthorized"),
            AppError::Validation(msg) => write!(f, "validation: {msg}"),
            AppError::Internal(cause) => write!(f, "internal: {cause}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            AppError::Internal(cause) => {
                tracing::error!(%cause, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
