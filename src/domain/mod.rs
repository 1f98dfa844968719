//! Domain module
//!
//! Order entity, domain events and business-rule errors.

pub mod context;
pub mod error;
pub mod events;
pub mod order;

pub use context::OperationContext;
pub use error::DomainError;
pub use events::{DecodeError, OrderEvent};
pub use order::{total_price, Order, Payment, ShopItem};
