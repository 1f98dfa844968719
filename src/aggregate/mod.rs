//! Aggregate module
//!
//! Aggregate Root pattern for Event Sourcing. An aggregate owns its
//! uncommitted-event buffer between load and save; the event log owns
//! everything committed.

pub mod order;

pub use order::OrderAggregate;

use crate::event_store::{Event, EventStoreError};

/// Aggregate type persisted with every order event
pub const ORDER_AGGREGATE_TYPE: &str = "order";

/// Prefix of every order stream id on the event log
pub const ORDER_STREAM_PREFIX: &str = "order-";

/// Build the event-log stream id for an order
pub fn order_stream_id(order_id: &str) -> String {
    format!("{ORDER_STREAM_PREFIX}{order_id}")
}

/// Recover the order id from its stream id
pub fn order_id_from_stream(stream_id: &str) -> String {
    stream_id
        .strip_prefix(ORDER_STREAM_PREFIX)
        .unwrap_or(stream_id)
        .to_string()
}

/// The seam the aggregate store loads and saves through
pub trait Aggregate {
    /// Aggregate type name (for storage)
    fn aggregate_type() -> &'static str
    where
        Self: Sized;

    /// Event-log stream id
    fn stream_id(&self) -> &str;

    /// Current version: the highest applied event's version, 0 if the
    /// aggregate never existed
    fn version(&self) -> i64;

    /// Rehydration path: apply a committed event read from the stream.
    /// Fails unless the event's version is exactly `version + 1`.
    fn raise_event(&mut self, event: Event) -> Result<(), EventStoreError>;

    /// Events applied in memory but not yet appended
    fn uncommitted(&self) -> &[Event];

    /// Called by the store after a successful append
    fn clear_uncommitted(&mut self);
}

/// An aggregate that was never written has version 0
pub fn is_aggregate_not_found(aggregate: &impl Aggregate) -> bool {
    aggregate.version() == 0
}
