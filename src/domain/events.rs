//! Domain Events
//!
//! The seven order events and their wire mapping. Payload encoding and
//! decoding live here and nowhere else; the stored representation keeps
//! the event type string and a JSON payload separate, so the shapes below
//! are the wire contract of the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::{Payment, ShopItem};

pub const ORDER_CREATED: &str = "ORDER_CREATED";
pub const ORDER_PAID: &str = "ORDER_PAID";
pub const ORDER_SUBMITTED: &str = "ORDER_SUBMITTED";
pub const ORDER_COMPLETED: &str = "ORDER_COMPLETED";
pub const ORDER_CANCELED: &str = "ORDER_CANCELED";
pub const SHOPPING_CART_UPDATED: &str = "SHOPPING_CART_UPDATED";
pub const DELIVERY_ADDRESS_CHANGED: &str = "DELIVERY_ADDRESS_CHANGED";

/// Order events as a tagged variant over the seven event types
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Created {
        shop_items: Vec<ShopItem>,
        account_email: String,
        delivery_address: String,
    },
    Paid(Payment),
    Submitted,
    ShoppingCartUpdated {
        shop_items: Vec<ShopItem>,
    },
    Canceled {
        cancel_reason: String,
    },
    Completed {
        delivery_timestamp: DateTime<Utc>,
    },
    DeliveryAddressChanged {
        delivery_address: String,
    },
}

/// Payload of ORDER_CREATED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedData {
    pub shop_items: Vec<ShopItem>,
    pub account_email: String,
    pub delivery_address: String,
}

/// Payload of SHOPPING_CART_UPDATED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartUpdatedData {
    pub shop_items: Vec<ShopItem>,
}

/// Payload of ORDER_CANCELED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCanceledData {
    pub cancel_reason: String,
}

/// Payload of ORDER_COMPLETED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompletedData {
    pub delivery_timestamp: DateTime<Utc>,
}

/// Payload of DELIVERY_ADDRESS_CHANGED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddressChangedData {
    pub delivery_address: String,
}

impl OrderEvent {
    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => ORDER_CREATED,
            OrderEvent::Paid(_) => ORDER_PAID,
            OrderEvent::Submitted => ORDER_SUBMITTED,
            OrderEvent::ShoppingCartUpdated { .. } => SHOPPING_CART_UPDATED,
            OrderEvent::Canceled { .. } => ORDER_CANCELED,
            OrderEvent::Completed { .. } => ORDER_COMPLETED,
            OrderEvent::DeliveryAddressChanged { .. } => DELIVERY_ADDRESS_CHANGED,
        }
    }

    /// Serialize the payload for storage.
    ///
    /// ORDER_PAID stores the payment object itself; ORDER_SUBMITTED has
    /// no payload and stores null.
    pub fn to_data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            OrderEvent::Created {
                shop_items,
                account_email,
                delivery_address,
            } => serde_json::to_value(OrderCreatedData {
                shop_items: shop_items.clone(),
                account_email: account_email.clone(),
                delivery_address: delivery_address.clone(),
            }),
            OrderEvent::Paid(payment) => serde_json::to_value(payment),
            OrderEvent::Submitted => Ok(serde_json::Value::Null),
            OrderEvent::ShoppingCartUpdated { shop_items } => {
                serde_json::to_value(ShoppingCartUpdatedData {
                    shop_items: shop_items.clone(),
                })
            }
            OrderEvent::Canceled { cancel_reason } => serde_json::to_value(OrderCanceledData {
                cancel_reason: cancel_reason.clone(),
            }),
            OrderEvent::Completed { delivery_timestamp } => {
                serde_json::to_value(OrderCompletedData {
                    delivery_timestamp: *delivery_timestamp,
                })
            }
            OrderEvent::DeliveryAddressChanged { delivery_address } => {
                serde_json::to_value(DeliveryAddressChangedData {
                    delivery_address: delivery_address.clone(),
                })
            }
        }
    }

    /// Decode a stored payload back into a domain event.
    ///
    /// Fails with `InvalidEventType` for types outside the vocabulary and
    /// with a serde error for malformed payloads.
    pub fn from_stored(
        event_type: &str,
        data: &serde_json::Value,
    ) -> Result<Self, DecodeError> {
        let event = match event_type {
            ORDER_CREATED => {
                let data: OrderCreatedData = serde_json::from_value(data.clone())?;
                OrderEvent::Created {
                    shop_items: data.shop_items,
                    account_email: data.account_email,
                    delivery_address: data.delivery_address,
                }
            }
            ORDER_PAID => OrderEvent::Paid(serde_json::from_value(data.clone())?),
            ORDER_SUBMITTED => OrderEvent::Submitted,
            SHOPPING_CART_UPDATED => {
                let data: ShoppingCartUpdatedData = serde_json::from_value(data.clone())?;
                OrderEvent::ShoppingCartUpdated {
                    shop_items: data.shop_items,
                }
            }
            ORDER_CANCELED => {
                let data: OrderCanceledData = serde_json::from_value(data.clone())?;
                OrderEvent::Canceled {
                    cancel_reason: data.cancel_reason,
                }
            }
            ORDER_COMPLETED => {
                let data: OrderCompletedData = serde_json::from_value(data.clone())?;
                OrderEvent::Completed {
                    delivery_timestamp: data.delivery_timestamp,
                }
            }
            DELIVERY_ADDRESS_CHANGED => {
                let data: DeliveryAddressChangedData = serde_json::from_value(data.clone())?;
                OrderEvent::DeliveryAddressChanged {
                    delivery_address: data.delivery_address,
                }
            }
            unknown => return Err(DecodeError::InvalidEventType(unknown.to_string())),
        };

        Ok(event)
    }
}

/// Errors decoding a stored event into a domain event
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_paid_payload_is_bare_payment_object() {
        let event = OrderEvent::Paid(Payment {
            payment_id: "p1".to_string(),
            timestamp: "2024-01-01T00:00:00Z".parse().unwrap(),
        });

        let data = event.to_data().unwrap();
        assert_eq!(data["paymentId"], "p1");

        let decoded = OrderEvent::from_stored(ORDER_PAID, &data).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_created_round_trip() {
        let event = OrderEvent::Created {
            shop_items: vec![ShopItem {
                id: "i1".to_string(),
                title: "t".to_string(),
                description: "d".to_string(),
                quantity: 2,
                price: dec!(5.0),
            }],
            account_email: "a@b.c".to_string(),
            delivery_address: "1 X St".to_string(),
        };

        let data = event.to_data().unwrap();
        assert!(data["shopItems"].is_array());
        assert_eq!(data["accountEmail"], "a@b.c");

        let decoded = OrderEvent::from_stored(ORDER_CREATED, &data).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_submitted_has_null_payload() {
        let data = OrderEvent::Submitted.to_data().unwrap();
        assert!(data.is_null());
        let decoded = OrderEvent::from_stored(ORDER_SUBMITTED, &data).unwrap();
        assert_eq!(decoded, OrderEvent::Submitted);
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let result = OrderEvent::from_stored("ORDER_EXPLODED", &serde_json::Value::Null);
        assert!(matches!(result, Err(DecodeError::InvalidEventType(t)) if t == "ORDER_EXPLODED"));
    }
}
