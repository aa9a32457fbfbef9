use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorBody, storage::StorageError};

/// AppError
///
/// The single error taxonomy of the portal. Every handler and extractor returns it,
/// and `IntoResponse` maps each variant onto its HTTP status with a JSON
/// `{ "error": ... }` body.
///
/// Database failures inside a mutating repository call are raised while the
/// transaction is still open; dropping the transaction on the `?` path rolls back
/// every partial write before the error reaches this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("admin privileges required")]
    Forbidden,

    /// Covers both absent rows and rows hidden from the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("upload storage error: {0}")]
    Upload(#[from] StorageError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Malformed or wrongly-typed request bodies are validation failures (400), not 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// A non-numeric or missing id segment is a validation failure with the usual JSON body.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details are logged, never sent to the client.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
