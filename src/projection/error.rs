//! Projection errors

use crate::domain::DecodeError;

/// Errors applying an event to a read model
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("order projection not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
