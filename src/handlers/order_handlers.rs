//! Order command handlers
//!
//! One handler per command, all the same shape: bind an aggregate to the
//! target stream, rehydrate it, invoke the domain method, save. Handlers
//! are stateless; commands on distinct orders run concurrently and
//! commands on the same order serialize through the expected-revision
//! check in the store.

use std::future::Future;
use std::time::Duration;

use crate::aggregate::{is_aggregate_not_found, Aggregate, OrderAggregate};
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;
use crate::event_store::{AggregateStore, EventStoreError};

use super::commands::{
    CancelOrderCommand, ChangeDeliveryAddressCommand, CompleteOrderCommand, CreateOrderCommand,
    PayOrderCommand, SubmitOrderCommand, UpdateShoppingCartCommand,
};

const MAX_COMMAND_ATTEMPTS: u32 = 3;

/// Re-run the whole load/decide/save cycle on an optimistic-concurrency
/// conflict, with a short backoff between attempts
async fn retry_on_conflict<F, Fut>(mut attempt_fn: F) -> Result<(), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match attempt_fn().await {
            Err(AppError::EventStore(err)) if err.is_concurrency_conflict() => {
                attempt += 1;
                if attempt >= MAX_COMMAND_ATTEMPTS {
                    return Err(AppError::EventStore(err));
                }
                tracing::warn!(
                    attempt,
                    max_attempts = MAX_COMMAND_ATTEMPTS,
                    "concurrency conflict, retrying command"
                );
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
            }
            other => return other,
        }
    }
}

/// Rehydrate an existing order or fail with `OrderNotFound`
async fn load_order(
    store: &AggregateStore,
    order_id: &str,
) -> Result<OrderAggregate, AppError> {
    let mut order = OrderAggregate::with_order_id(order_id);
    store.load(&mut order).await?;

    if is_aggregate_not_found(&order) {
        return Err(DomainError::OrderNotFound.into());
    }

    Ok(order)
}

/// Handler for CreateOrder
pub struct CreateOrderHandler {
    store: AggregateStore,
}

impl CreateOrderHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: CreateOrderCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let mut order = OrderAggregate::with_order_id(&command.order_id);

        match self.store.exists(order.stream_id()).await {
            Ok(()) => return Err(DomainError::OrderAlreadyExists.into()),
            Err(EventStoreError::StreamNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        order.create_order(
            command.shop_items,
            command.account_email,
            command.delivery_address,
            context,
        )?;

        // A racing create loses the append; surface it as already-exists
        self.store.save(&mut order).await.map_err(|err| {
            if err.is_concurrency_conflict() {
                AppError::from(DomainError::OrderAlreadyExists)
            } else {
                err.into()
            }
        })
    }
}

/// Handler for PayOrder
pub struct PayOrderHandler {
    store: AggregateStore,
}

impl PayOrderHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: PayOrderCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.pay_order(command.payment.clone(), context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}

/// Handler for SubmitOrder
pub struct SubmitOrderHandler {
    store: AggregateStore,
}

impl SubmitOrderHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: SubmitOrderCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.submit_order(context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}

/// Handler for UpdateShoppingCart
pub struct UpdateShoppingCartHandler {
    store: AggregateStore,
}

impl UpdateShoppingCartHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: UpdateShoppingCartCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.update_shopping_cart(command.shop_items.clone(), context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}

/// Handler for CancelOrder
pub struct CancelOrderHandler {
    store: AggregateStore,
}

impl CancelOrderHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: CancelOrderCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.cancel_order(command.cancel_reason.clone(), context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}

/// Handler for CompleteOrder
pub struct CompleteOrderHandler {
    store: AggregateStore,
}

impl CompleteOrderHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: CompleteOrderCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.complete_order(command.delivery_timestamp, context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}

/// Handler for ChangeDeliveryAddress
pub struct ChangeDeliveryAddressHandler {
    store: AggregateStore,
}

impl ChangeDeliveryAddressHandler {
    pub fn new(store: AggregateStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: ChangeDeliveryAddressCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        retry_on_conflict(|| async {
            let mut order = load_order(&self.store, &command.order_id).await?;
            order.change_delivery_address(command.delivery_address.clone(), context)?;
            self.store.save(&mut order).await?;
            Ok(())
        })
        .await
    }
}
