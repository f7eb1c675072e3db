//! Cart repository.
//!
//! Every mutation runs in one transaction: the cart header row is locked,
//! lines are rewritten and the stored totals are recomputed from the lines
//! before commit.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{
    CartId, PriceLine, PricingPolicy, Product, ProductId, Totals, UserId, merge_lines,
};

use super::RepositoryError;
use super::catalog::{PRODUCT_COLUMNS, ProductRow};
use crate::models::{Cart, CartOwner};

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Item not found in cart")]
    NotInCart,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Requested quantity exceeds what is in stock.
    #[error("Only {available} left in stock")]
    InsufficientStock { available: i32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartHeaderRow {
    id: Uuid,
    user_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: Uuid,
    name: String,
    slug: String,
    image: String,
    qty: i32,
    price: Decimal,
}

impl From<CartLineRow> for PriceLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            slug: row.slug,
            image: row.image,
            qty: row.qty,
            price: row.price,
        }
    }
}

/// `WHERE` clause and bind value selecting an owner's cart.
///
/// Anonymous tokens never resolve a cart that has been adopted by a user.
fn owner_predicate(owner: CartOwner) -> (&'static str, Uuid) {
    match owner {
        CartOwner::User(id) => ("user_id = $1", id.as_uuid()),
        CartOwner::Session(token) => ("session_token = $1 AND user_id IS NULL", token),
    }
}

// =============================================================================
// Transaction helpers (shared with checkout)
// =============================================================================

/// Lock the owner's cart row, returning its id.
pub(crate) async fn lock_cart(
    conn: &mut PgConnection,
    owner: CartOwner,
) -> Result<Option<CartId>, sqlx::Error> {
    let (predicate, key) = owner_predicate(owner);
    let id: Option<Uuid> =
        sqlx::query_scalar(&format!("SELECT id FROM carts WHERE {predicate} FOR UPDATE"))
            .bind(key)
            .fetch_optional(conn)
            .await?;
    Ok(id.map(CartId::new))
}

/// A cart's lines in the order they were added.
pub(crate) async fn load_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<PriceLine>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT product_id, name, slug, image, qty, price FROM cart_items \
         WHERE cart_id = $1 ORDER BY added_at, product_id",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(PriceLine::from).collect())
}

async fn insert_line(
    conn: &mut PgConnection,
    cart_id: CartId,
    line: &PriceLine,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_id, name, slug, image, qty, price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET \
             name = EXCLUDED.name, slug = EXCLUDED.slug, image = EXCLUDED.image, \
             qty = EXCLUDED.qty, price = EXCLUDED.price",
    )
    .bind(cart_id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(&line.slug)
    .bind(&line.image)
    .bind(line.qty)
    .bind(line.price)
    .execute(conn)
    .await?;
    Ok(())
}

async fn load_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
    ))
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Product::from))
}

async fn line_qty(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT qty FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await
}

async fn delete_line(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Recompute and store a cart's totals, returning the full cart.
async fn refresh_totals(
    conn: &mut PgConnection,
    cart_id: CartId,
    policy: &PricingPolicy,
) -> Result<Cart, sqlx::Error> {
    let items = load_lines(conn, cart_id).await?;
    let totals = Totals::compute(&items, policy);

    let user_id: Option<Uuid> = sqlx::query_scalar(
        "UPDATE carts SET items_price = $2, shipping_price = $3, tax_price = $4, \
             total_price = $5, updated_at = NOW() \
         WHERE id = $1 RETURNING user_id",
    )
    .bind(cart_id)
    .bind(totals.items_price)
    .bind(totals.shipping_price)
    .bind(totals.tax_price)
    .bind(totals.total_price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Cart {
        id: cart_id,
        user_id: user_id.map(UserId::new),
        items,
        totals,
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for carts and their lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
    policy: PricingPolicy,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository pricing totals under `policy`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: PricingPolicy) -> Self {
        Self { pool, policy }
    }

    /// The owner's cart, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find(&self, owner: CartOwner) -> Result<Option<Cart>, RepositoryError> {
        let (predicate, key) = owner_predicate(owner);
        let Some(header) = sqlx::query_as::<_, CartHeaderRow>(&format!(
            "SELECT id, user_id FROM carts WHERE {predicate}"
        ))
        .bind(key)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let id = CartId::new(header.id);
        let items = load_lines(&mut conn, id).await?;
        // Stored totals always match the lines; recomputing keeps policy
        // changes visible without a write.
        let totals = Totals::compute(&items, &self.policy);

        Ok(Some(Cart {
            id,
            user_id: header.user_id.map(UserId::new),
            items,
            totals,
        }))
    }

    /// Add `qty` units of a product, creating the cart on first use.
    ///
    /// The line snapshots the product's current selling price.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for unknown products,
    /// `CartError::InsufficientStock` when the resulting quantity exceeds
    /// stock, and `CartError::InvalidQuantity` for non-positive `qty`.
    pub async fn add_item(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        qty: i32,
    ) -> Result<Cart, CartError> {
        if qty < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await?;

        // The upsert takes the row lock for the rest of the transaction.
        let cart_id: Option<Uuid> = match owner {
            CartOwner::User(user_id) => {
                sqlx::query_scalar(
                    "INSERT INTO carts (user_id, session_token) VALUES ($1, gen_random_uuid()) \
                     ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() \
                     RETURNING id",
                )
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
            }
            CartOwner::Session(token) => {
                sqlx::query_scalar(
                    "INSERT INTO carts (session_token) VALUES ($1) \
                     ON CONFLICT (session_token) DO UPDATE SET updated_at = NOW() \
                     WHERE carts.user_id IS NULL \
                     RETURNING id",
                )
                .bind(token)
                .fetch_optional(&mut *tx)
                .await?
            }
        };
        let cart_id = CartId::new(cart_id.ok_or(CartError::CartNotFound)?);

        let product = load_product(&mut tx, product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let existing = line_qty(&mut tx, cart_id, product_id).await?.unwrap_or(0);
        let wanted = existing.saturating_add(qty);
        if wanted > product.stock {
            return Err(CartError::InsufficientStock {
                available: product.stock,
            });
        }

        let line = PriceLine {
            product_id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            image: product.primary_image().to_owned(),
            qty: wanted,
            price: product.price_at(chrono::Utc::now()),
        };
        insert_line(&mut tx, cart_id, &line).await?;

        let cart = refresh_totals(&mut tx, cart_id, &self.policy).await?;
        tx.commit().await?;

        tracing::debug!(cart_id = %cart.id, product_id = %product_id, qty = wanted, "Cart line added");
        Ok(cart)
    }

    /// Take one unit of a product out of the cart, dropping the line at zero.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` or `CartError::NotInCart` when there
    /// is nothing to remove.
    pub async fn remove_item(
        &self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;

        let cart_id = lock_cart(&mut tx, owner)
            .await?
            .ok_or(CartError::CartNotFound)?;
        let qty = line_qty(&mut tx, cart_id, product_id)
            .await?
            .ok_or(CartError::NotInCart)?;

        if qty <= 1 {
            delete_line(&mut tx, cart_id, product_id).await?;
        } else {
            sqlx::query(
                "UPDATE cart_items SET qty = qty - 1 WHERE cart_id = $1 AND product_id = $2",
            )
            .bind(cart_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        let cart = refresh_totals(&mut tx, cart_id, &self.policy).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for negative quantities,
    /// `CartError::InsufficientStock` above stock, and
    /// `CartError::NotInCart` when the product has no line.
    pub async fn set_quantity(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        qty: i32,
    ) -> Result<Cart, CartError> {
        if qty < 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await?;

        let cart_id = lock_cart(&mut tx, owner)
            .await?
            .ok_or(CartError::CartNotFound)?;
        if line_qty(&mut tx, cart_id, product_id).await?.is_none() {
            return Err(CartError::NotInCart);
        }

        if qty == 0 {
            delete_line(&mut tx, cart_id, product_id).await?;
        } else {
            let product = load_product(&mut tx, product_id)
                .await?
                .ok_or(CartError::ProductNotFound)?;
            if qty > product.stock {
                return Err(CartError::InsufficientStock {
                    available: product.stock,
                });
            }
            sqlx::query("UPDATE cart_items SET qty = $3 WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .bind(qty)
                .execute(&mut *tx)
                .await?;
        }

        let cart = refresh_totals(&mut tx, cart_id, &self.policy).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Delete the owner's cart. Returns whether a cart existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, owner: CartOwner) -> Result<bool, RepositoryError> {
        let (predicate, key) = owner_predicate(owner);
        let result = sqlx::query(&format!("DELETE FROM carts WHERE {predicate}"))
            .bind(key)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fold the anonymous cart behind `token` into the user's cart.
    ///
    /// Quantities for the same product are summed and the anonymous line's
    /// snapshot wins. A user without a cart adopts the anonymous one. Returns
    /// `None` when the token has no cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn merge_on_login(
        &self,
        token: Uuid,
        user_id: UserId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(session_cart) = lock_cart(&mut tx, CartOwner::Session(token)).await? else {
            return Ok(None);
        };
        let user_cart = lock_cart(&mut tx, CartOwner::User(user_id)).await?;

        let cart_id = match user_cart {
            None => {
                sqlx::query("UPDATE carts SET user_id = $2 WHERE id = $1")
                    .bind(session_cart)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                session_cart
            }
            Some(user_cart) => {
                let existing = load_lines(&mut tx, user_cart).await?;
                let incoming = load_lines(&mut tx, session_cart).await?;
                for line in merge_lines(existing, incoming) {
                    insert_line(&mut tx, user_cart, &line).await?;
                }
                sqlx::query("DELETE FROM carts WHERE id = $1")
                    .bind(session_cart)
                    .execute(&mut *tx)
                    .await?;
                user_cart
            }
        };

        let cart = refresh_totals(&mut tx, cart_id, &self.policy).await?;
        tx.commit().await?;

        tracing::info!(cart_id = %cart.id, user_id = %user_id, "Merged session cart");
        Ok(Some(cart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_predicate_excludes_adopted_carts() {
        let token = Uuid::new_v4();
        let (predicate, key) = owner_predicate(CartOwner::Session(token));
        assert!(predicate.contains("user_id IS NULL"));
        assert_eq!(key, token);

        let user = UserId::generate();
        let (predicate, key) = owner_predicate(CartOwner::User(user));
        assert_eq!(predicate, "user_id = $1");
        assert_eq!(key, user.as_uuid());
    }

    #[test]
    fn test_cart_error_messages() {
        assert_eq!(
            CartError::InsufficientStock { available: 2 }.to_string(),
            "Only 2 left in stock"
        );
        assert_eq!(CartError::ProductNotFound.to_string(), "Product not found");
    }
}
