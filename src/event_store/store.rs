//! Aggregate Store
//!
//! Rehydrates aggregates from their event stream and appends uncommitted
//! events under an optimistic-concurrency expectation. Appends are a
//! single transaction, so partial failure is not observable.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::aggregate::Aggregate;

use super::error::EventStoreError;
use super::event::Event;

/// Event store backed by an append-only `events` table with a global feed
#[derive(Debug, Clone)]
pub struct AggregateStore {
    pool: PgPool,
}

type EventRow = (
    Uuid,
    String,
    String,
    String,
    i64,
    serde_json::Value,
    serde_json::Value,
    DateTime<Utc>,
);

fn event_from_row(row: EventRow) -> Event {
    let (event_id, stream_id, aggregate_type, event_type, version, data, metadata, timestamp) = row;
    Event {
        event_id,
        aggregate_id: stream_id,
        aggregate_type,
        event_type,
        version,
        timestamp,
        data,
        metadata,
    }
}

impl AggregateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether a stream exists
    pub async fn exists(&self, stream_id: &str) -> Result<(), EventStoreError> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM events WHERE stream_id = $1 LIMIT 1")
                .bind(stream_id)
                .fetch_optional(&self.pool)
                .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(EventStoreError::StreamNotFound(stream_id.to_string())),
        }
    }

    /// Rehydrate an aggregate by replaying its stream in version order.
    ///
    /// A missing stream is not an error: the aggregate is left at
    /// version 0 and the caller distinguishes new from missing.
    pub async fn load<A: Aggregate>(&self, aggregate: &mut A) -> Result<(), EventStoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT event_id, stream_id, aggregate_type, event_type, version, data, metadata, timestamp
            FROM events
            WHERE stream_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate.stream_id())
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            aggregate.raise_event(event_from_row(row))?;
        }

        Ok(())
    }

    /// Append the aggregate's uncommitted events under the expected
    /// revision. On success the uncommitted buffer is cleared.
    ///
    /// The expectation is the revision the aggregate was loaded at:
    /// `version - uncommitted.len()`, with 0 meaning the stream must not
    /// exist yet. A mismatch surfaces as `ConcurrencyConflict`; callers
    /// may retry the whole load/decide/save cycle.
    pub async fn save<A: Aggregate>(&self, aggregate: &mut A) -> Result<(), EventStoreError> {
        if aggregate.uncommitted().is_empty() {
            return Ok(());
        }

        let stream_id = aggregate.stream_id().to_string();
        let expected = aggregate.version() - aggregate.uncommitted().len() as i64;

        let mut tx = self.pool.begin().await?;

        // Read the stream's current revision (the last event, if any)
        let current: i64 =
            sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(&stream_id)
                .fetch_one(&mut *tx)
                .await?
                .unwrap_or(0);

        if current != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual: current,
            });
        }

        for event in aggregate.uncommitted() {
            let result = sqlx::query(
                r#"
                INSERT INTO events (
                    event_id, stream_id, aggregate_type, event_type,
                    version, data, metadata, timestamp
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id)
            .bind(&event.aggregate_id)
            .bind(&event.aggregate_type)
            .bind(&event.event_type)
            .bind(event.version)
            .bind(&event.data)
            .bind(&event.metadata)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await;

            // A concurrent writer between the revision check and the
            // insert trips the (stream_id, version) unique index
            if let Err(err) = result {
                if is_unique_violation(&err) {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: event.version,
                    });
                }
                return Err(err.into());
            }
        }

        tx.commit().await?;

        tracing::debug!(
            stream_id = %stream_id,
            appended = aggregate.uncommitted().len(),
            version = aggregate.version(),
            "events appended"
        );

        aggregate.clear_uncommitted();
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
