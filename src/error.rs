use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message returned to clients for every internal failure. The underlying
/// cause only goes to the operator logs.
pub const REDACTED_INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is the routine "unknown user" outcome rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::UserNotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::UserNotFound(_) => (StatusCode::NOT_FOUND, "User not found"),
            _ => {
                tracing::error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, REDACTED_INTERNAL_MESSAGE)
            }
        };

        let body = Json(json!({
            "detail": detail
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
