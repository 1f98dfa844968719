//! Event Store Errors

use crate::domain::DecodeError;

/// Errors that can occur in the event store
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict on append
    #[error("concurrency conflict on stream {stream_id}: expected revision {expected}, found {actual}")]
    ConcurrencyConflict {
        stream_id: String,
        expected: i64,
        actual: i64,
    },

    /// The stream does not exist
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// Rehydration received an event out of version order
    #[error("version mismatch on stream {stream_id}: expected {expected}, got {actual}")]
    VersionMismatch {
        stream_id: String,
        expected: i64,
        actual: i64,
    },

    /// The subscription group has not been created
    #[error("subscription group not found: {0}")]
    SubscriptionGroupNotFound(String),

    /// Stored event could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}
