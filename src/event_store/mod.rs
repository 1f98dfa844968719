//! Event Store module
//!
//! Event record, aggregate store and persistent subscriptions over the
//! append-only log.

pub mod error;
pub mod event;
pub mod snapshot;
pub mod store;
pub mod subscription;

pub use error::EventStoreError;
pub use event::{Event, ResolvedEvent};
pub use snapshot::{Snapshot, SnapshotStore};
pub use store::AggregateStore;
pub use subscription::{
    PersistentSubscription, SubscriptionClient, SubscriptionReply, SubscriptionSettings,
};
