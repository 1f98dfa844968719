//! Persistent Subscriptions
//!
//! Named, cursor-tracked subscriptions over the global event feed,
//! filtered by stream prefix. Workers within a group compete for events
//! and must Ack or Nack every delivery: the group checkpoint only
//! advances past contiguously acknowledged positions, so a restart
//! redelivers everything unacknowledged (at-least-once).
//!
//! One `PersistentSubscription` handle is shared by all workers of a
//! group; its delivery state sits behind a mutex so `recv`/`ack`/`nack`
//! are safe to call from any worker task.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Mutex;

use super::error::EventStoreError;
use super::event::{Event, ResolvedEvent};

/// What `recv` yields to a worker
#[derive(Debug)]
pub enum SubscriptionReply {
    /// The next event delivered to this subscriber
    EventAppeared(ResolvedEvent),
    /// The subscription can no longer deliver; the caller restarts the
    /// whole subscribe call
    Dropped(String),
}

/// Tuning for the subscription feed
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    /// Events fetched from the feed per round trip
    pub batch_size: i64,
    /// Sleep between polls when the feed is dry
    pub poll_interval: Duration,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            batch_size: 256,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Creates subscription groups and connects to them
#[derive(Debug, Clone)]
pub struct SubscriptionClient {
    pool: PgPool,
}

impl SubscriptionClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a subscription group with a stream-prefix filter.
    ///
    /// A group that already exists is not an error; its cursor is kept.
    pub async fn create_group(&self, group: &str, prefix: &str) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_groups (group_name, stream_prefix, checkpoint)
            VALUES ($1, $2, 0)
            ON CONFLICT (group_name) DO NOTHING
            "#,
        )
        .bind(group)
        .bind(prefix)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Connect to an existing group, resuming from its checkpoint
    pub async fn connect(&self, group: &str) -> Result<PersistentSubscription, EventStoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT stream_prefix, checkpoint FROM subscription_groups WHERE group_name = $1",
        )
        .bind(group)
        .fetch_optional(&self.pool)
        .await?;

        let (prefix, checkpoint) = row
            .ok_or_else(|| EventStoreError::SubscriptionGroupNotFound(group.to_string()))?;

        Ok(PersistentSubscription {
            pool: self.pool.clone(),
            group: group.to_string(),
            prefix,
            settings: SubscriptionSettings::default(),
            tracker: Mutex::new(DeliveryTracker::new(checkpoint)),
        })
    }
}

/// A connected subscription shared cooperatively by a worker pool
#[derive(Debug)]
pub struct PersistentSubscription {
    pool: PgPool,
    group: String,
    prefix: String,
    settings: SubscriptionSettings,
    tracker: Mutex<DeliveryTracker>,
}

impl PersistentSubscription {
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Block until the next event is deliverable to this subscriber.
    ///
    /// Events of a stream are delivered serially: an event is held back
    /// while an earlier event of the same stream is unacknowledged.
    /// Storage failures surface as `Dropped`; the caller restarts the
    /// subscription.
    pub async fn recv(&self) -> SubscriptionReply {
        loop {
            {
                let mut tracker = self.tracker.lock().await;
                if let Some(resolved) = tracker.next() {
                    return SubscriptionReply::EventAppeared(resolved);
                }

                match self.fetch_after(tracker.fetched_through()).await {
                    Ok(events) if !events.is_empty() => {
                        tracker.enqueue(events);
                        if let Some(resolved) = tracker.next() {
                            return SubscriptionReply::EventAppeared(resolved);
                        }
                        // everything fetched is behind an in-flight
                        // delivery of the same stream; poll again
                        continue;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        return SubscriptionReply::Dropped(format!(
                            "subscription {} dropped: {err}",
                            self.group
                        ));
                    }
                }
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Acknowledge a delivery, persisting the group checkpoint when it
    /// advances
    pub async fn ack(&self, resolved: &ResolvedEvent) -> Result<(), EventStoreError> {
        let advanced = {
            let mut tracker = self.tracker.lock().await;
            tracker.ack(resolved.position)
        };

        if let Some(checkpoint) = advanced {
            // checkpoint only moves forward, even if two acks persist
            // out of order
            sqlx::query(
                "UPDATE subscription_groups SET checkpoint = $1, updated_at = NOW() \
                 WHERE group_name = $2 AND checkpoint < $1",
            )
            .bind(checkpoint)
            .bind(&self.group)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Reject a delivery; the event is redelivered to the group
    pub async fn nack(&self, resolved: &ResolvedEvent, reason: &str) -> Result<(), EventStoreError> {
        tracing::warn!(
            group = %self.group,
            position = resolved.position,
            event_type = %resolved.event.event_type,
            reason,
            "event nacked, will redeliver"
        );

        let mut tracker = self.tracker.lock().await;
        tracker.nack(resolved.position);
        Ok(())
    }

    async fn fetch_after(&self, position: i64) -> Result<Vec<ResolvedEvent>, EventStoreError> {
        let rows: Vec<(i64, uuid::Uuid, String, String, String, i64, serde_json::Value, serde_json::Value, chrono::DateTime<chrono::Utc>)> =
            sqlx::query_as(
                r#"
                SELECT global_position, event_id, stream_id, aggregate_type, event_type,
                       version, data, metadata, timestamp
                FROM events
                WHERE global_position > $1 AND stream_id LIKE $2
                ORDER BY global_position ASC
                LIMIT $3
                "#,
            )
            .bind(position)
            .bind(format!("{}%", self.prefix))
            .bind(self.settings.batch_size)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (global_position, event_id, stream_id, aggregate_type, event_type, version, data, metadata, timestamp) = row;
                ResolvedEvent {
                    position: global_position,
                    event: Event {
                        event_id,
                        aggregate_id: stream_id,
                        aggregate_type,
                        event_type,
                        version,
                        timestamp,
                        data,
                        metadata,
                    },
                }
            })
            .collect())
    }
}

// =========================================================================
// Delivery tracking
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryState {
    Ready,
    InFlight,
    Acked,
}

#[derive(Debug)]
struct PendingDelivery {
    resolved: ResolvedEvent,
    state: DeliveryState,
}

/// In-memory delivery state of one subscription group.
///
/// Invariants: the checkpoint only moves past contiguously acknowledged
/// positions, and at most one event per stream is in flight.
#[derive(Debug)]
struct DeliveryTracker {
    checkpoint: i64,
    pending: BTreeMap<i64, PendingDelivery>,
    in_flight_streams: HashSet<String>,
}

impl DeliveryTracker {
    fn new(checkpoint: i64) -> Self {
        Self {
            checkpoint,
            pending: BTreeMap::new(),
            in_flight_streams: HashSet::new(),
        }
    }

    /// Highest position already fetched into the tracker
    fn fetched_through(&self) -> i64 {
        self.pending
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.checkpoint)
    }

    fn enqueue(&mut self, events: Vec<ResolvedEvent>) {
        for resolved in events {
            if resolved.position <= self.checkpoint || self.pending.contains_key(&resolved.position)
            {
                continue;
            }
            self.pending.insert(
                resolved.position,
                PendingDelivery {
                    resolved,
                    state: DeliveryState::Ready,
                },
            );
        }
    }

    /// Next deliverable event: the lowest ready position whose stream
    /// has nothing in flight
    fn next(&mut self) -> Option<ResolvedEvent> {
        let position = self.pending.iter().find_map(|(position, delivery)| {
            let stream = &delivery.resolved.event.aggregate_id;
            (delivery.state == DeliveryState::Ready && !self.in_flight_streams.contains(stream))
                .then_some(*position)
        })?;

        let delivery = self.pending.get_mut(&position)?;
        delivery.state = DeliveryState::InFlight;
        self.in_flight_streams
            .insert(delivery.resolved.event.aggregate_id.clone());
        Some(delivery.resolved.clone())
    }

    /// Mark a delivery done; returns the new checkpoint if it advanced
    fn ack(&mut self, position: i64) -> Option<i64> {
        let delivery = self.pending.get_mut(&position)?;
        delivery.state = DeliveryState::Acked;
        self.in_flight_streams
            .remove(&delivery.resolved.event.aggregate_id);

        let mut advanced = false;
        while let Some(entry) = self.pending.first_entry() {
            if entry.get().state != DeliveryState::Acked {
                break;
            }
            self.checkpoint = *entry.key();
            entry.remove();
            advanced = true;
        }

        advanced.then_some(self.checkpoint)
    }

    /// Put a delivery back for redelivery
    fn nack(&mut self, position: i64) {
        if let Some(delivery) = self.pending.get_mut(&position) {
            delivery.state = DeliveryState::Ready;
            self.in_flight_streams
                .remove(&delivery.resolved.event.aggregate_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(position: i64, stream: &str) -> ResolvedEvent {
        ResolvedEvent {
            position,
            event: Event::new(stream, "order", "ORDER_SUBMITTED", 1, serde_json::Value::Null),
        }
    }

    #[test]
    fn test_delivers_in_feed_order_across_streams() {
        let mut tracker = DeliveryTracker::new(0);
        tracker.enqueue(vec![resolved(1, "order-a"), resolved(2, "order-b")]);

        assert_eq!(tracker.next().unwrap().position, 1);
        assert_eq!(tracker.next().unwrap().position, 2);
        assert!(tracker.next().is_none());
    }

    #[test]
    fn test_same_stream_is_serial() {
        let mut tracker = DeliveryTracker::new(0);
        tracker.enqueue(vec![
            resolved(1, "order-a"),
            resolved(2, "order-a"),
            resolved(3, "order-b"),
        ]);

        let first = tracker.next().unwrap();
        assert_eq!(first.position, 1);

        // position 2 is held back behind the in-flight delivery of the
        // same stream; position 3 interleaves freely
        let second = tracker.next().unwrap();
        assert_eq!(second.position, 3);
        assert!(tracker.next().is_none());

        tracker.ack(1);
        assert_eq!(tracker.next().unwrap().position, 2);
    }

    #[test]
    fn test_nack_redelivers_same_event() {
        let mut tracker = DeliveryTracker::new(0);
        tracker.enqueue(vec![resolved(1, "order-a"), resolved(2, "order-a")]);

        let first = tracker.next().unwrap();
        tracker.nack(first.position);

        // the nacked event is redelivered before its successor
        assert_eq!(tracker.next().unwrap().position, 1);
    }

    #[test]
    fn test_checkpoint_advances_contiguously() {
        let mut tracker = DeliveryTracker::new(0);
        tracker.enqueue(vec![
            resolved(1, "order-a"),
            resolved(2, "order-b"),
            resolved(3, "order-c"),
        ]);

        let first = tracker.next().unwrap();
        let second = tracker.next().unwrap();
        let third = tracker.next().unwrap();

        // acks out of order: checkpoint waits for position 1
        assert_eq!(tracker.ack(second.position), None);
        assert_eq!(tracker.ack(third.position), None);
        assert_eq!(tracker.ack(first.position), Some(3));
        assert_eq!(tracker.fetched_through(), 3);
    }

    #[test]
    fn test_enqueue_skips_known_positions() {
        let mut tracker = DeliveryTracker::new(5);
        tracker.enqueue(vec![resolved(4, "order-a"), resolved(6, "order-a")]);
        tracker.enqueue(vec![resolved(6, "order-a"), resolved(7, "order-b")]);

        // position 4 is behind the checkpoint, 6 was deduplicated
        assert_eq!(tracker.next().unwrap().position, 6);
        assert_eq!(tracker.next().unwrap().position, 7);
        assert!(tracker.next().is_none());
    }
}
