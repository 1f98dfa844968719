//! Order Aggregate
//!
//! The order state machine. All business rules live here: command
//! handlers and projections never inspect flags to decide legality.

use chrono::{DateTime, Utc};

use crate::domain::{DomainError, OperationContext, Order, OrderEvent, Payment, ShopItem};
use crate::error::AppError;
use crate::event_store::{Event, EventStoreError};

use super::{order_stream_id, Aggregate, ORDER_AGGREGATE_TYPE};

/// Order aggregate: current state plus the uncommitted-event buffer
#[derive(Debug, Clone)]
pub struct OrderAggregate {
    /// Event-log stream id (`order-<uuid>`)
    id: String,
    /// Highest applied event's version; 0 means the order never existed
    version: i64,
    order: Order,
    uncommitted: Vec<Event>,
}

impl OrderAggregate {
    /// Create an empty aggregate bound to an order id
    pub fn with_order_id(order_id: &str) -> Self {
        let mut order = Order::default();
        order.id = order_id.to_string();
        Self {
            id: order_stream_id(order_id),
            version: 0,
            order,
            uncommitted: Vec::new(),
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_id(&self) -> &str {
        &self.order.id
    }

    /// Command path: assign the next version, apply the transition in
    /// memory and queue the event for persistence.
    fn apply(
        &mut self,
        domain_event: OrderEvent,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let mut event = Event::new(
            &self.id,
            ORDER_AGGREGATE_TYPE,
            domain_event.event_type(),
            self.version + 1,
            domain_event.to_data()?,
        );
        event.set_metadata(serde_json::to_value(context)?);

        self.order.apply(&domain_event);
        self.uncommitted.push(event);
        self.version += 1;
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn create_order(
        &mut self,
        shop_items: Vec<ShopItem>,
        account_email: String,
        delivery_address: String,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.version != 0 {
            return Err(DomainError::OrderAlreadyExists.into());
        }
        if shop_items.is_empty() {
            return Err(DomainError::ShopItemsRequired.into());
        }
        if delivery_address.is_empty() {
            return Err(DomainError::InvalidDeliveryAddress.into());
        }

        self.apply(
            OrderEvent::Created {
                shop_items,
                account_email,
                delivery_address,
            },
            context,
        )
    }

    pub fn pay_order(
        &mut self,
        payment: Payment,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.order.canceled {
            return Err(DomainError::AlreadyCanceled.into());
        }
        if self.order.paid {
            return Err(DomainError::AlreadyPaid.into());
        }
        if self.order.submitted {
            return Err(DomainError::AlreadySubmitted.into());
        }

        self.apply(OrderEvent::Paid(payment), context)
    }

    pub fn submit_order(&mut self, context: &OperationContext) -> Result<(), AppError> {
        if self.order.canceled {
            return Err(DomainError::AlreadyCanceled.into());
        }
        if !self.order.paid {
            return Err(DomainError::NotPaid.into());
        }
        if self.order.submitted {
            return Err(DomainError::AlreadySubmitted.into());
        }

        self.apply(OrderEvent::Submitted, context)
    }

    pub fn update_shopping_cart(
        &mut self,
        shop_items: Vec<ShopItem>,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.order.canceled {
            return Err(DomainError::AlreadyCanceled.into());
        }
        if self.order.submitted {
            return Err(DomainError::AlreadySubmitted.into());
        }

        self.apply(OrderEvent::ShoppingCartUpdated { shop_items }, context)
    }

    pub fn cancel_order(
        &mut self,
        cancel_reason: String,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.order.completed {
            return Err(DomainError::AlreadyCompleted.into());
        }
        if cancel_reason.is_empty() {
            return Err(DomainError::CancelReasonRequired.into());
        }

        self.apply(OrderEvent::Canceled { cancel_reason }, context)
    }

    pub fn complete_order(
        &mut self,
        delivery_timestamp: DateTime<Utc>,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.order.completed {
            return Err(DomainError::AlreadyCompleted.into());
        }
        if self.order.canceled {
            return Err(DomainError::AlreadyCanceled.into());
        }
        if !self.order.paid {
            return Err(DomainError::MustBePaidBeforeDelivered.into());
        }

        self.apply(OrderEvent::Completed { delivery_timestamp }, context)
    }

    pub fn change_delivery_address(
        &mut self,
        delivery_address: String,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if self.order.completed {
            return Err(DomainError::AlreadyCompleted.into());
        }

        self.apply(
            OrderEvent::DeliveryAddressChanged { delivery_address },
            context,
        )
    }
}

impl Aggregate for OrderAggregate {
    fn aggregate_type() -> &'static str {
        ORDER_AGGREGATE_TYPE
    }

    fn stream_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn raise_event(&mut self, event: Event) -> Result<(), EventStoreError> {
        if event.version != self.version + 1 {
            return Err(EventStoreError::VersionMismatch {
                stream_id: self.id.clone(),
                expected: self.version + 1,
                actual: event.version,
            });
        }

        let domain_event = OrderEvent::from_stored(&event.event_type, &event.data)?;
        self.order.apply(&domain_event);
        self.version += 1;
        Ok(())
    }

    fn uncommitted(&self) -> &[Event] {
        &self.uncommitted
    }

    fn clear_uncommitted(&mut self) {
        self.uncommitted.clear();
    }
}
