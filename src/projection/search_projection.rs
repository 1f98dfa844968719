//! Search-index projection
//!
//! Maintains the full-text read model. ORDER_CREATED indexes a fresh
//! document; every other event is a read-modify-write of the stored
//! document followed by a re-index.

use async_trait::async_trait;

use crate::aggregate::order_id_from_stream;
use crate::domain::{total_price, DecodeError, OrderEvent};
use crate::event_store::Event;

use super::error::ProjectionError;
use super::order_projection::OrderProjection;
use super::projector::ProjectionHandler;
use super::search_store::OrderSearchRepository;

pub struct SearchProjection {
    repo: OrderSearchRepository,
    group: String,
}

impl SearchProjection {
    pub fn new(repo: OrderSearchRepository, group: impl Into<String>) -> Self {
        Self {
            repo,
            group: group.into(),
        }
    }

    async fn load_document(&self, order_id: &str) -> Result<OrderProjection, ProjectionError> {
        self.repo
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ProjectionError::NotFound(order_id.to_string()))
    }
}

#[async_trait]
impl ProjectionHandler for SearchProjection {
    fn name(&self) -> &'static str {
        "search-index"
    }

    fn group(&self) -> &str {
        &self.group
    }

    async fn when(&self, event: &Event) -> Result<(), ProjectionError> {
        let order_id = order_id_from_stream(&event.aggregate_id);

        let domain_event = match OrderEvent::from_stored(&event.event_type, &event.data) {
            Ok(domain_event) => domain_event,
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
                let document = OrderProjection {
                    order_id,
                    total_price: total_price(&shop_items),
                    shop_items,
                    account_email,
                    delivery_address,
                    ..Default::default()
                };
                self.repo.index(&document).await
            }

            OrderEvent::Paid(payment) => {
                let mut document = self.load_document(&order_id).await?;
                document.paid = true;
                document.payment = Some(payment);
                self.repo.index(&document).await
            }

            OrderEvent::Submitted => {
                let mut document = self.load_document(&order_id).await?;
                document.submitted = true;
                self.repo.index(&document).await
            }

            OrderEvent::ShoppingCartUpdated { shop_items } => {
                let mut document = self.load_document(&order_id).await?;
                document.total_price = total_price(&shop_items);
                document.shop_items = shop_items;
                self.repo.index(&document).await
            }

            OrderEvent::Canceled { cancel_reason } => {
                let mut document = self.load_document(&order_id).await?;
                document.canceled = true;
                document.completed = false;
                document.cancel_reason = cancel_reason;
                self.repo.index(&document).await
            }

            OrderEvent::Completed { delivery_timestamp } => {
                let mut document = self.load_document(&order_id).await?;
                document.completed = true;
                document.canceled = false;
                document.delivered_time = Some(delivery_timestamp);
                self.repo.index(&document).await
            }

            OrderEvent::DeliveryAddressChanged { delivery_address } => {
                let mut document = self.load_document(&order_id).await?;
                document.delivery_address = delivery_address;
                self.repo.index(&document).await
            }
        }
    }
}
