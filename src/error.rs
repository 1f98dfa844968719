//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::DomainError;
use crate::event_store::EventStoreError;
use crate::projection::ProjectionError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Whether error responses carry the underlying cause. Set once at
/// startup from `logger.debug`.
static DEBUG_ERRORS: OnceLock<bool> = OnceLock::new();

pub fn set_debug_errors(enabled: bool) {
    let _ = DEBUG_ERRORS.set(enabled);
}

fn debug_errors() -> bool {
    *DEBUG_ERRORS.get().unwrap_or(&false)
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request shape is invalid
    #[error("validation error: {0}")]
    Validation(String),

    /// A command pre-condition was violated
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            AppError::Domain(DomainError::OrderNotFound) => StatusCode::NOT_FOUND,
            AppError::Domain(_) => StatusCode::BAD_REQUEST,

            AppError::EventStore(EventStoreError::StreamNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::EventStore(EventStoreError::Database(err))
            | AppError::Database(err)
                if is_timeout(err) =>
            {
                StatusCode::REQUEST_TIMEOUT
            }

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn is_timeout(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::PoolTimedOut)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        // The cause chain is only exposed when debug logging is on
        let message = if debug_errors() {
            std::error::Error::source(&self).map(|source| source.to_string())
        } else {
            None
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            error: self.to_string(),
            message,
            timestamp: Utc::now(),
        };

        (status, Json(body)).into_response()
    }
}
