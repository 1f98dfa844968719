//! Command definitions
//!
//! Commands represent intentions to change an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Payment, ShopItem};

/// Command to create a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderCommand {
    pub order_id: String,
    pub shop_items: Vec<ShopItem>,
    pub account_email: String,
    pub delivery_address: String,
}

/// Command to attach a payment to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayOrderCommand {
    pub order_id: String,
    pub payment: Payment,
}

/// Command to submit a paid order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderCommand {
    pub order_id: String,
}

/// Command to replace the shopping cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateShoppingCartCommand {
    pub order_id: String,
    pub shop_items: Vec<ShopItem>,
}

/// Command to cancel an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderCommand {
    pub order_id: String,
    pub cancel_reason: String,
}

/// Command to mark an order delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOrderCommand {
    pub order_id: String,
    pub delivery_timestamp: DateTime<Utc>,
}

/// Command to change the delivery address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDeliveryAddressCommand {
    pub order_id: String,
    pub delivery_address: String,
}
