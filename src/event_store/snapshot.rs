//! Snapshots
//!
//! Snapshotting is an optimisation that reduces time spent replaying
//! events. The type and store interface are reserved; no implementation
//! is wired yet.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::EventStoreError;

/// A point-in-time capture of aggregate state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub aggregate_type: String,
    pub state: serde_json::Value,
    pub version: i64,
}

/// Store interface for aggregate snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Save an aggregate snapshot
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), EventStoreError>;

    /// Load the latest snapshot for a stream
    async fn get_snapshot(&self, stream_id: &str) -> Result<Option<Snapshot>, EventStoreError>;
}
