//! Event record
//!
//! The immutable record appended to the event log. Payloads are opaque
//! JSON decoded on demand; metadata is opaque and carries correlation
//! context across the command and projection paths.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// An immutable domain event as stored in the log
#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: Uuid,
    /// Stream identifier, e.g. `order-<uuid>`
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    /// Monotonic per-aggregate version; the first event of a stream is 1
    pub version: i64,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
}

impl Event {
    /// Create a new event for an aggregate
    pub fn new(
        aggregate_id: &str,
        aggregate_type: &str,
        event_type: &str,
        version: i64,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: aggregate_type.to_string(),
            event_type: event_type.to_string(),
            version,
            timestamp: Utc::now(),
            data,
            metadata: serde_json::Value::Null,
        }
    }

    /// Decode the payload into a concrete type
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: serde_json::Value) {
        self.metadata = metadata;
    }
}

/// An event delivered through a persistent subscription, together with
/// its position on the global feed
#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    /// Position on the global, log-ordered feed
    pub position: i64,
    pub event: Event,
}
