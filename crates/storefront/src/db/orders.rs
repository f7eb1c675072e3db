//! Order placement and order history.
//!
//! Placement is the only multi-table write in the storefront. It runs in a
//! single transaction that locks the cart, conditionally decrements stock,
//! writes the order with its numbered lines, saves the buyer's address and
//! payment method, and deletes the cart. Any failure rolls everything back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{
    Email, FieldErrors, Order, OrderId, OrderLine, PageRequest, Paginated, PaymentMethod,
    PricingPolicy, ProductId, ShippingAddress, Totals, UserId,
};

use super::carts::{load_lines, lock_cart};
use super::users::{USER_COLUMNS, UserRow};
use super::{RepositoryError, conflict_on_unique};
use crate::models::{CartOwner, User};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please fix the highlighted fields")]
    Validation(FieldErrors),

    #[error("Your cart is empty")]
    EmptyCart,

    /// A guest tried to check out with an e-mail that already has an account.
    #[error("An account with this email already exists. Please sign in to continue.")]
    AccountExists,

    /// A product no longer has enough stock for its cart line.
    #[error("{0} is no longer available in the requested quantity")]
    Unavailable(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Who is paying for an order.
#[derive(Debug, Clone, Copy)]
pub enum Buyer<'a> {
    /// A signed-in user.
    Member(UserId),
    /// An anonymous visitor; an account without a password is created.
    Guest { email: &'a Email },
}

/// Everything needed to turn a cart into an order.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub cart: CartOwner,
    pub buyer: Buyer<'a>,
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Result of a successful placement.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub totals: Totals,
    /// The account created for a guest buyer.
    pub guest: Option<User>,
}

/// An order as shown to its owner, with the buyer's name and e-mail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub buyer_name: String,
    pub buyer_email: String,
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
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
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
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
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    #[sqlx(flatten)]
    order: OrderRow,
    buyer_name: String,
    buyer_email: String,
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

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.shipping_address, o.payment_method, \
     o.items_price, o.shipping_price, o.tax_price, o.total_price, \
     o.is_paid, o.paid_at, o.is_delivered, o.delivered_at, o.created_at";

/// Lines for each of `order_ids`, keyed by order.
async fn lines_for(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderLine>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderLineRow>(
        "SELECT order_id, line_no, product_id, name, slug, image, qty, price \
         FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_no",
    )
    .bind(order_ids)
    .fetch_all(conn)
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

/// Repository for storefront order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the buyer's cart into an order.
    ///
    /// Stock is decremented in product id order so concurrent checkouts
    /// sharing products lock rows in the same sequence.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` when the cart is missing or has no lines
    /// - `CheckoutError::AccountExists` when a guest e-mail is already taken
    /// - `CheckoutError::Unavailable` when a line exceeds remaining stock
    /// - `CheckoutError::Repository` for database failures
    pub async fn place_order(
        &self,
        new_order: NewOrder<'_>,
        policy: &PricingPolicy,
    ) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let Some(cart_id) = lock_cart(&mut tx, new_order.cart).await? else {
            return Err(CheckoutError::EmptyCart);
        };
        let lines = load_lines(&mut tx, cart_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let (user_id, guest) = match new_order.buyer {
            Buyer::Member(id) => (id, None),
            Buyer::Guest { email } => {
                let row = sqlx::query_as::<_, UserRow>(&format!(
                    "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
                ))
                .bind(email.default_display_name())
                .bind(email.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match conflict_on_unique(e, "user") {
                    RepositoryError::Conflict(_) => CheckoutError::AccountExists,
                    other => CheckoutError::Repository(other),
                })?;
                let user = User::try_from(row)?;
                (user.id, Some(user))
            }
        };

        let mut by_product: Vec<_> = lines.iter().collect();
        by_product.sort_by_key(|line| line.product_id);
        for line in by_product {
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id)
            .bind(line.qty)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(CheckoutError::Unavailable(line.name.clone()));
            }
        }

        let totals = Totals::compute(&lines, policy);

        let order_id: Uuid = sqlx::query_scalar(
            "INSERT INTO orders (user_id, shipping_address, payment_method, \
                 items_price, shipping_price, tax_price, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(user_id)
        .bind(Json(new_order.shipping_address))
        .bind(new_order.payment_method)
        .bind(totals.items_price)
        .bind(totals.shipping_price)
        .bind(totals.tax_price)
        .bind(totals.total_price)
        .fetch_one(&mut *tx)
        .await?;

        for line in OrderLine::number(&lines) {
            sqlx::query(
                "INSERT INTO order_items \
                     (order_id, line_no, product_id, name, slug, image, qty, price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(order_id)
            .bind(line.line_no)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(&line.slug)
            .bind(&line.image)
            .bind(line.qty)
            .bind(line.price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE users SET address = $2, payment_method = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(Json(new_order.shipping_address))
        .bind(new_order.payment_method)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let order_id = OrderId::new(order_id);
        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            total = %totals.total_price,
            guest = guest.is_some(),
            "Order placed"
        );

        Ok(PlacedOrder {
            order_id,
            totals,
            guest,
        })
    }

    /// An order owned by `user_id`. Orders of other users are invisible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_owner(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderDetailRow>(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS buyer_name, u.email AS buyer_email \
             FROM orders o JOIN users u ON u.id = o.user_id \
             WHERE o.id = $1 AND o.user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let lines = lines_for(&mut conn, &[row.order.id])
            .await?
            .remove(&row.order.id)
            .unwrap_or_default();

        Ok(Some(OrderDetail {
            order: row.order.into_order(lines),
            buyer_name: row.buyer_name,
            buyer_email: row.buyer_email,
        }))
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Paginated<Order>, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.user_id = $1 \
             ORDER BY o.created_at DESC, o.id LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut conn = self.pool.acquire().await?;
        let mut lines = lines_for(&mut conn, &ids).await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_order(order_lines)
            })
            .collect();

        Ok(Paginated::new(orders, count, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_error_messages() {
        assert_eq!(CheckoutError::EmptyCart.to_string(), "Your cart is empty");
        assert_eq!(
            CheckoutError::Unavailable("Ajrak Shawl".to_owned()).to_string(),
            "Ajrak Shawl is no longer available in the requested quantity"
        );
    }
}
