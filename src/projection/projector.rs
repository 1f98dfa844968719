//! Projector runtime
//!
//! Connects a projection handler to a persistent subscription and runs a
//! worker pool over the shared stream handle. Delivery is at-least-once:
//! a failed handler nacks and the log redelivers; handlers are
//! idempotent so re-application is safe.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::event_store::{
    EventStoreError, PersistentSubscription, SubscriptionClient, SubscriptionReply,
};
use crate::event_store::Event;

use super::error::ProjectionError;

/// Per-event-type mutations of one read model
#[async_trait]
pub trait ProjectionHandler: Send + Sync + 'static {
    /// Projection name for logs
    fn name(&self) -> &'static str;

    /// Persistent-subscription group this projection consumes through
    fn group(&self) -> &str;

    /// Apply one event to the read model
    async fn when(&self, event: &Event) -> Result<(), ProjectionError>;
}

/// Errors that terminate a projector
#[derive(Debug, thiserror::Error)]
pub enum ProjectorError {
    /// The server stopped delivering; the embedding service restarts
    #[error("subscription dropped: {0}")]
    SubscriptionDropped(String),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("projection worker panicked: {0}")]
    Worker(String),
}

/// Runs one projection over a persistent subscription
pub struct Projector<H> {
    client: SubscriptionClient,
    handler: Arc<H>,
    stream_prefix: String,
    pool_size: usize,
}

impl<H: ProjectionHandler> Projector<H> {
    pub fn new(
        client: SubscriptionClient,
        handler: H,
        stream_prefix: impl Into<String>,
        pool_size: usize,
    ) -> Self {
        Self {
            client,
            handler: Arc::new(handler),
            stream_prefix: stream_prefix.into(),
            pool_size,
        }
    }

    /// Create the subscription group if needed, connect once, and run
    /// the worker pool until cancellation or the first worker error.
    ///
    /// The first non-cancel error cancels the sibling workers and is
    /// returned; the caller is expected to terminate and be restarted by
    /// its supervisor.
    pub async fn subscribe(&self, cancel: CancellationToken) -> Result<(), ProjectorError> {
        self.client
            .create_group(self.handler.group(), &self.stream_prefix)
            .await?;

        let subscription = Arc::new(self.client.connect(self.handler.group()).await?);

        tracing::info!(
            projection = self.handler.name(),
            group = self.handler.group(),
            workers = self.pool_size + 1,
            "projector subscribed"
        );

        let worker_cancel = cancel.child_token();
        let mut workers = JoinSet::new();
        for worker_id in 0..=self.pool_size {
            workers.spawn(process_events(
                Arc::clone(&subscription),
                Arc::clone(&self.handler),
                worker_cancel.clone(),
                worker_id,
            ));
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.unwrap_or_else(|err| Err(ProjectorError::Worker(err.to_string())));
            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                    worker_cancel.cancel();
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Worker loop over the shared subscription handle
async fn process_events<H: ProjectionHandler>(
    subscription: Arc<PersistentSubscription>,
    handler: Arc<H>,
    cancel: CancellationToken,
    worker_id: usize,
) -> Result<(), ProjectorError> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let reply = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            reply = subscription.recv() => reply,
        };

        match reply {
            SubscriptionReply::Dropped(reason) => {
                return Err(ProjectorError::SubscriptionDropped(reason));
            }

            SubscriptionReply::EventAppeared(resolved) => {
                tracing::info!(
                    projection = handler.name(),
                    group = subscription.group(),
                    worker_id,
                    event_type = %resolved.event.event_type,
                    stream_id = %resolved.event.aggregate_id,
                    version = resolved.event.version,
                    "projection event"
                );

                match handler.when(&resolved.event).await {
                    Err(err) => {
                        subscription
                            .nack(&resolved, &err.to_string())
                            .await
                            .map_err(ProjectorError::Store)?;
                    }
                    Ok(()) => {
                        subscription
                            .ack(&resolved)
                            .await
                            .map_err(ProjectorError::Store)?;
                    }
                }
            }
        }
    }
}
