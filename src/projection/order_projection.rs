//! Order projection row
//!
//! Denormalised order for the read paths. Created by the first
//! projection of ORDER_CREATED, mutated by subsequent projections,
//! never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::OrderAggregate;
use crate::domain::{Payment, ShopItem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProjection {
    pub order_id: String,
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

impl From<&OrderAggregate> for OrderProjection {
    fn from(aggregate: &OrderAggregate) -> Self {
        let order = aggregate.order();
        Self {
            order_id: order.id.clone(),
            shop_items: order.shop_items.clone(),
            account_email: order.account_email.clone(),
            delivery_address: order.delivery_address.clone(),
            cancel_reason: order.cancel_reason.clone(),
            total_price: order.total_price,
            delivered_time: order.delivered_time,
            paid: order.paid,
            submitted: order.submitted,
            completed: order.completed,
            canceled: order.canceled,
            payment: order.payment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationContext;
    use rust_decimal_macros::dec;

    #[test]
    fn test_projection_from_rehydrated_aggregate() {
        let mut aggregate = OrderAggregate::with_order_id("o1");
        aggregate
            .create_order(
                vec![ShopItem {
                    id: "i1".to_string(),
                    title: "t".to_string(),
                    description: "d".to_string(),
                    quantity: 2,
                    price: dec!(5.0),
                }],
                "a@b.c".to_string(),
                "1 X St".to_string(),
                &OperationContext::new(),
            )
            .unwrap();

        let projection = OrderProjection::from(&aggregate);
        assert_eq!(projection.order_id, "o1");
        assert_eq!(projection.total_price, dec!(10.0));
        assert!(!projection.paid);
        assert!(projection.payment.is_none());
    }
}
