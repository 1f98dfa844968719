//! Command Handlers module
//!
//! CQRS command handlers: load the aggregate, invoke the domain method,
//! append under the expected revision.

mod commands;
mod order_handlers;

pub use commands::*;
pub use order_handlers::{
    CancelOrderHandler, ChangeDeliveryAddressHandler, CompleteOrderHandler, CreateOrderHandler,
    PayOrderHandler, SubmitOrderHandler, UpdateShoppingCartHandler,
};
