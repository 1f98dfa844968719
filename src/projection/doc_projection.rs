//! Document-store projection
//!
//! Maintains the point-lookup read model from the order event feed.

use async_trait::async_trait;

use crate::aggregate::order_id_from_stream;
use crate::domain::{total_price, DecodeError, OrderEvent};
use crate::event_store::Event;

use super::doc_store::OrderDocumentRepository;
use super::error::ProjectionError;
use super::order_projection::OrderProjection;
use super::projector::ProjectionHandler;

pub struct DocStoreProjection {
    repo: OrderDocumentRepository,
    group: String,
}

impl DocStoreProjection {
    pub fn new(repo: OrderDocumentRepository, group: impl Into<String>) -> Self {
        Self {
            repo,
            group: group.into(),
        }
    }
}

#[async_trait]
impl ProjectionHandler for DocStoreProjection {
    fn name(&self) -> &'static str {
        "doc-store"
    }

    fn group(&self) -> &str {
        &self.group
    }

    async fn when(&self, event: &Event) -> Result<(), ProjectionError> {
        let order_id = order_id_from_stream(&event.aggregate_id);

        let domain_event = match OrderEvent::from_stored(&event.event_type, &event.data) {
            Ok(domain_event) => domain_event,
            // An unrecognised type would otherwise nack forever; log and
            // skip so a newer deployment's events don't wedge the group
            Err(DecodeError::InvalidEventType(event_type)) => {
                tracing::warn!(
                    projection = self.name(),
                    event_type,
                    "unknown event type, skipping"
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match domain_event {
            OrderEvent::Created {
                shop_items,
                account_email,
                delivery_address,
            } => {
                let projection = OrderProjection {
                    order_id,
                    total_price: total_price(&shop_items),
                    shop_items,
                    account_email,
                    delivery_address,
                    ..Default::default()
                };
                self.repo.upsert(&projection).await?;
                Ok(())
            }

            OrderEvent::Paid(payment) => self.repo.update_payment(&order_id, &payment).await,

            OrderEvent::Submitted => self.repo.update_submit(&order_id).await,

            OrderEvent::ShoppingCartUpdated { shop_items } => {
                self.repo
                    .update_cart(&order_id, &shop_items, total_price(&shop_items))
                    .await
            }

            OrderEvent::Canceled { cancel_reason } => {
                self.repo.update_cancel(&order_id, &cancel_reason).await
            }

            OrderEvent::Completed { delivery_timestamp } => {
                self.repo.complete(&order_id, delivery_timestamp).await
            }

            OrderEvent::DeliveryAddressChanged { delivery_address } => {
                self.repo
                    .update_delivery_address(&order_id, &delivery_address)
                    .await
            }
        }
    }
}
