//! Document-store repository
//!
//! Point-lookup read model keyed by order id. All writes are blind
//! setters of fields determined by the event payload, so re-applying a
//! delivery leaves the row unchanged (idempotent apply). Inserts are
//! upserts, which also makes the query-side write-through benign when it
//! races a projector insert.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{Payment, ShopItem};

use super::error::ProjectionError;
use super::order_projection::OrderProjection;

#[derive(Debug, Clone)]
pub struct OrderDocumentRepository {
    pool: PgPool,
    table: String,
}

type DocRow = (
    String,
    Json<Vec<ShopItem>>,
    String,
    String,
    String,
    Decimal,
    Option<DateTime<Utc>>,
    bool,
    bool,
    bool,
    bool,
    Option<Json<Payment>>,
);

fn projection_from_row(row: DocRow) -> OrderProjection {
    let (
        order_id,
        shop_items,
        account_email,
        delivery_address,
        cancel_reason,
        total_price,
        delivered_time,
        paid,
        submitted,
        completed,
        canceled,
        payment,
    ) = row;

    OrderProjection {
        order_id,
        shop_items: shop_items.0,
        account_email,
        delivery_address,
        cancel_reason,
        total_price,
        delivered_time,
        paid,
        submitted,
        completed,
        canceled,
        payment: payment.map(|p| p.0),
    }
}

impl OrderDocumentRepository {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Insert or replace the full projection row
    pub async fn upsert(&self, order: &OrderProjection) -> Result<String, ProjectionError> {
        let query = format!(
            r#"
            INSERT INTO {} (
                order_id, shop_items, account_email, delivery_address, cancel_reason,
                total_price, delivered_time, paid, submitted, completed, canceled, payment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_id) DO UPDATE SET
                shop_items = EXCLUDED.shop_items,
                account_email = EXCLUDED.account_email,
                delivery_address = EXCLUDED.delivery_address,
                cancel_reason = EXCLUDED.cancel_reason,
                total_price = EXCLUDED.total_price,
                delivered_time = EXCLUDED.delivered_time,
                paid = EXCLUDED.paid,
                submitted = EXCLUDED.submitted,
                completed = EXCLUDED.completed,
                canceled = EXCLUDED.canceled,
                payment = EXCLUDED.payment,
                updated_at = NOW()
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(&order.order_id)
            .bind(Json(&order.shop_items))
            .bind(&order.account_email)
            .bind(&order.delivery_address)
            .bind(&order.cancel_reason)
            .bind(order.total_price)
            .bind(order.delivered_time)
            .bind(order.paid)
            .bind(order.submitted)
            .bind(order.completed)
            .bind(order.canceled)
            .bind(order.payment.as_ref().map(Json))
            .execute(&self.pool)
            .await?;

        Ok(order.order_id.clone())
    }

    pub async fn get_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderProjection>, ProjectionError> {
        let query = format!(
            r#"
            SELECT order_id, shop_items, account_email, delivery_address, cancel_reason,
                   total_price, delivered_time, paid, submitted, completed, canceled, payment
            FROM {}
            WHERE order_id = $1
            "#,
            self.table
        );

        let row: Option<DocRow> = sqlx::query_as(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(projection_from_row))
    }

    pub async fn update_payment(
        &self,
        order_id: &str,
        payment: &Payment,
    ) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET paid = TRUE, payment = $2, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(Json(payment))
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    pub async fn update_submit(&self, order_id: &str) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET submitted = TRUE, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    pub async fn update_cart(
        &self,
        order_id: &str,
        shop_items: &[ShopItem],
        total_price: Decimal,
    ) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET shop_items = $2, total_price = $3, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(Json(shop_items))
            .bind(total_price)
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    pub async fn update_cancel(
        &self,
        order_id: &str,
        cancel_reason: &str,
    ) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET canceled = TRUE, completed = FALSE, cancel_reason = $2, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(cancel_reason)
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    pub async fn complete(
        &self,
        order_id: &str,
        delivered_time: DateTime<Utc>,
    ) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET completed = TRUE, delivered_time = $2, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(delivered_time)
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    pub async fn update_delivery_address(
        &self,
        order_id: &str,
        delivery_address: &str,
    ) -> Result<(), ProjectionError> {
        let query = format!(
            "UPDATE {} SET delivery_address = $2, updated_at = NOW() WHERE order_id = $1",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(delivery_address)
            .execute(&self.pool)
            .await?;

        self.require_row(order_id, result.rows_affected())
    }

    /// A missing row is an error so the worker nacks and the log
    /// redelivers after the creating event lands
    fn require_row(&self, order_id: &str, rows_affected: u64) -> Result<(), ProjectionError> {
        if rows_affected == 0 {
            return Err(ProjectionError::NotFound(order_id.to_string()));
        }
        Ok(())
    }
}
