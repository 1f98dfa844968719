//! Request/response types
//!
//! JSON bodies are camelCase. Shape validation happens here, before a
//! command is built; pre-condition checks stay in the aggregate.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::ShopItem;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shop_items: Vec<ShopItem>,
    pub account_email: String,
    pub delivery_address: String,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_shop_items(&self.shop_items)?;
        validate_email(&self.account_email)?;
        if self.delivery_address.trim().is_empty() {
            return Err(AppError::Validation(
                "deliveryAddress must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOrderRequest {
    pub payment_id: String,
    pub timestamp: DateTime<Utc>,
}

impl PayOrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.payment_id.trim().is_empty() {
            return Err(AppError::Validation(
                "paymentId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShoppingCartRequest {
    pub shop_items: Vec<ShopItem>,
}

impl UpdateShoppingCartRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_shop_items(&self.shop_items)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub cancel_reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDeliveryAddressRequest {
    pub delivery_address: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

fn validate_shop_items(shop_items: &[ShopItem]) -> Result<(), AppError> {
    if shop_items.is_empty() {
        return Err(AppError::Validation(
            "shopItems must not be empty".to_string(),
        ));
    }

    for item in shop_items {
        if item.id.trim().is_empty() {
            return Err(AppError::Validation("shop item id is required".to_string()));
        }
        if item.price.is_sign_negative() {
            return Err(AppError::Validation(format!(
                "shop item {} has a negative price",
                item.id
            )));
        }
    }

    Ok(())
}

/// RFC 5322 basic form: non-empty local part and domain with a dot,
/// no whitespace
fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid accountEmail: {email}"
        )))
    }
}
