//! Order lookup, fulfillment toggles and deletion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{
    Order, OrderId, OrderLine, PageRequest, Paginated, PaymentMethod, ProductId, ShippingAddress,
    Totals, UserId,
};

use super::{RepositoryError, contains_pattern};

/// Errors from the fulfillment toggles.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Order not found")]
    NotFound,

    /// Delivery requires payment first.
    #[error("Order is not paid")]
    NotPaid,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// A row in the order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub buyer_name: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An order with its lines and buyer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub buyer_name: String,
    pub buyer_email: String,
}

/// Outcome of marking an order paid.
#[derive(Debug, Clone)]
pub struct MarkedPaid {
    pub order: OrderDetail,
    /// False when the order was already paid; `paid_at` is left untouched.
    pub newly_paid: bool,
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    id: Uuid,
    user_id: Uuid,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    items_price: Decimal,
    shipping_price: Decimal,
    tax_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    buyer_name: String,
    buyer_email: String,
}

impl OrderDetailRow {
    fn into_detail(self, lines: Vec<OrderLine>) -> OrderDetail {
        OrderDetail {
            order: Order {
                id: OrderId::new(self.id),
                user_id: UserId::new(self.user_id),
                shipping_address: self.shipping_address.0,
                payment_method: self.payment_method,
                totals: Totals {
                    items_price: self.items_price,
                    shipping_price: self.shipping_price,
                    tax_price: self.tax_price,
                    total_price: self.total_price,
                },
                is_paid: self.is_paid,
                paid_at: self.paid_at,
                is_delivered: self.is_delivered,
                delivered_at: self.delivered_at,
                created_at: self.created_at,
                lines,
            },
            buyer_name: self.buyer_name,
            buyer_email: self.buyer_email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: Uuid,
    line_no: i32,
    product_id: Uuid,
    name: String,
    slug: String,
    image: String,
    qty: i32,
    price: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            line_no: row.line_no,
            product_id: ProductId::new(row.product_id),
            name: row.name,
            slug: row.slug,
            image: row.image,
            qty: row.qty,
            price: row.price,
        }
    }
}

pub(crate) const SUMMARY_COLUMNS: &str = "o.id, u.name AS buyer_name, o.total_price, \
     o.is_paid, o.paid_at, o.is_delivered, o.delivered_at, o.created_at";

const DETAIL_COLUMNS: &str = "o.id, o.user_id, o.shipping_address, o.payment_method, \
     o.items_price, o.shipping_price, o.tax_price, o.total_price, \
     o.is_paid, o.paid_at, o.is_delivered, o.delivered_at, o.created_at, \
     u.name AS buyer_name, u.email AS buyer_email";

async fn lines_for(
    executor: impl PgExecutor<'_>,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderLine>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderLineRow>(
        "SELECT order_id, line_no, product_id, name, slug, image, qty, price \
         FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_no",
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in rows {
        by_order.entry(row.order_id).or_default().push(row.into());
    }
    Ok(by_order)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for back-office order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders newest first, optionally filtered by buyer name.
    ///
    /// The count covers the filtered rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        buyer_name: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<OrderSummary>, RepositoryError> {
        let pattern = buyer_name.map(contains_pattern);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id \
             WHERE $1::text IS NULL OR u.name ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM orders o JOIN users u ON u.id = o.user_id \
             WHERE $1::text IS NULL OR u.name ILIKE $1 \
             ORDER BY o.created_at DESC, o.id LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Paginated::new(rows, count, page))
    }

    /// An order with lines and buyer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderDetailRow>(&format!(
            "SELECT {DETAIL_COLUMNS} FROM orders o JOIN users u ON u.id = o.user_id \
             WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = lines_for(self.pool, &[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();
        Ok(Some(row.into_detail(lines)))
    }

    /// Mark an order paid. Repeated calls keep the first `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::NotFound` for an unknown order.
    pub async fn mark_paid(&self, id: OrderId) -> Result<MarkedPaid, FulfillmentError> {
        let updated = sqlx::query(
            "UPDATE orders SET is_paid = TRUE, paid_at = NOW() WHERE id = $1 AND NOT is_paid",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        let order = self.get(id).await?.ok_or(FulfillmentError::NotFound)?;
        let newly_paid = updated.rows_affected() == 1;
        Ok(MarkedPaid { order, newly_paid })
    }

    /// Mark a paid order delivered. Repeated calls keep the first `delivered_at`.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::NotPaid` when the order is unpaid and
    /// `FulfillmentError::NotFound` for an unknown order.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<OrderDetail, FulfillmentError> {
        let updated = sqlx::query(
            "UPDATE orders SET is_delivered = TRUE, \
             delivered_at = COALESCE(delivered_at, NOW()) \
             WHERE id = $1 AND is_paid",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        let order = self.get(id).await?.ok_or(FulfillmentError::NotFound)?;
        if updated.rows_affected() == 0 {
            return Err(FulfillmentError::NotPaid);
        }
        Ok(order)
    }

    /// Delete an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_messages() {
        assert_eq!(FulfillmentError::NotPaid.to_string(), "Order is not paid");
        assert_eq!(FulfillmentError::NotFound.to_string(), "Order not found");
    }
}
