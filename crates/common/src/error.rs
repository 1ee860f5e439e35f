use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types used across the application.
///
/// `Validation`, `MissingIdempotencyKey` and `InvalidIdempotencyKey` are client
/// errors: rejected before anything is persisted and never retried.
/// `Database` is a storage error: the surrounding transaction is rolled back.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request must carry an X-Idempotency-Key header")]
    MissingIdempotencyKey,

    #[error("Invalid idempotency key '{0}': expected a UUID")]
    InvalidIdempotencyKey(String),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::MissingIdempotencyKey
                | AppError::InvalidIdempotencyKey(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MissingIdempotencyKey
            | AppError::InvalidIdempotencyKey(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Payload(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Storage failure while handling request");
                "Internal storage error".to_string()
            }
            _ => self.to_string(),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
