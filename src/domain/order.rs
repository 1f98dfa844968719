//! Order entity
//!
//! The order is the domain entity owned by the order aggregate.
//! State is derived from events, never directly mutated by callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::events::OrderEvent;

/// A line item in the shopping cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: u64,
    pub price: Decimal,
}

/// Payment attached to an order once it is paid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Sum of quantity x price over the cart
pub fn total_price(shop_items: &[ShopItem]) -> Decimal {
    shop_items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

/// Current order state, folded from the event stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub shop_items: Vec<ShopItem>,
    pub account_email: String,
    pub delivery_address: String,
    pub cancel_reason: String,
    pub total_price: Decimal,
    pub delivered_time: Option<DateTime<Utc>>,
    pub paid: bool,
    pub submitted: bool,
    pub completed: bool,
    pub canceled: bool,
    pub payment: Option<Payment>,
}

impl Order {
    /// Pure transition function: fold one event into the current state.
    ///
    /// Replaying the stream in version order through this function
    /// reproduces the order state exactly.
    pub fn apply(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::Created {
                shop_items,
                account_email,
                delivery_address,
            } => {
                self.shop_items = shop_items.clone();
                self.account_email = account_email.clone();
                self.delivery_address = delivery_address.clone();
                self.total_price = total_price(shop_items);
            }

            OrderEvent::Paid(payment) => {
                self.paid = true;
                self.payment = Some(payment.clone());
            }

            OrderEvent::Submitted => {
                self.submitted = true;
            }

            OrderEvent::ShoppingCartUpdated { shop_items } => {
                self.shop_items = shop_items.clone();
                self.total_price = total_price(shop_items);
            }

            // Canceled and completed are mutually exclusive: last writer wins
            OrderEvent::Canceled { cancel_reason } => {
                self.canceled = true;
                self.completed = false;
                self.cancel_reason = cancel_reason.clone();
            }

            OrderEvent::Completed { delivery_timestamp } => {
                self.completed = true;
                self.canceled = false;
                self.delivered_time = Some(*delivery_timestamp);
            }

            OrderEvent::DeliveryAddressChanged { delivery_address } => {
                self.delivery_address = delivery_address.clone();
            }
        }
    }
}
