//! Cart route handlers.
//!
//! The cart is resolved from the signed-in user or the session's anonymous
//! token. Reading never creates a cart; the first add does.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CartId, PriceLine, ProductId, Totals};

use crate::db::CartRepository;
use crate::error::{Result, add_breadcrumb};
use crate::extract;
use crate::middleware::OptionalAuth;
use crate::models::Cart;
use crate::routes::Action;
use crate::services::cart::{CartError, ensure_owner, resolve_owner};
use crate::state::AppState;

/// Add-to-cart payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemForm {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub qty: i32,
}

const fn one() -> i32 {
    1
}

/// Set-quantity payload.
#[derive(Debug, Deserialize)]
pub struct SetQuantityForm {
    pub qty: i32,
}

/// Cart payload; an absent cart is shown as empty with zero totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Option<CartId>,
    pub items: Vec<PriceLine>,
    pub item_count: i64,
    #[serde(flatten)]
    pub totals: Totals,
}

impl From<Option<Cart>> for CartView {
    fn from(cart: Option<Cart>) -> Self {
        match cart {
            Some(cart) => Self {
                id: Some(cart.id),
                item_count: cart.item_count(),
                items: cart.items,
                totals: cart.totals,
            },
            None => Self {
                id: None,
                items: Vec::new(),
                item_count: 0,
                totals: Totals::default(),
            },
        }
    }
}

/// The visitor's cart.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    let Some(owner) = resolve_owner(&session, user.as_ref()).await? else {
        return Ok(Json(CartView::from(None)));
    };
    let cart = CartRepository::new(state.pool(), state.pricing())
        .find(owner)
        .await?;
    Ok(Json(CartView::from(cart)))
}

/// Add a product to the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    extract::Json(form): extract::Json<AddItemForm>,
) -> Result<Json<Action<CartView>>> {
    let owner = ensure_owner(&session, user.as_ref()).await?;
    let cart = CartRepository::new(state.pool(), state.pricing())
        .add_item(owner, form.product_id, form.qty)
        .await?;

    let product_id = form.product_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

    let message = cart
        .items
        .iter()
        .find(|line| line.product_id == form.product_id)
        .map_or_else(|| "Added to cart".to_owned(), |line| format!("{} added to cart", line.name));

    Ok(Json(Action::ok(message).with_data(CartView::from(Some(cart)))))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, session, user))]
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    extract::Json(form): extract::Json<SetQuantityForm>,
) -> Result<Json<Action<CartView>>> {
    let owner = resolve_owner(&session, user.as_ref())
        .await?
        .ok_or(CartError::CartNotFound)?;
    let cart = CartRepository::new(state.pool(), state.pricing())
        .set_quantity(owner, product_id, form.qty)
        .await?;
    Ok(Json(Action::ok("Cart updated").with_data(CartView::from(Some(cart)))))
}

/// Remove one unit of a product.
#[instrument(skip(state, session, user))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Action<CartView>>> {
    let owner = resolve_owner(&session, user.as_ref())
        .await?
        .ok_or(CartError::CartNotFound)?;
    let cart = CartRepository::new(state.pool(), state.pricing())
        .remove_item(owner, product_id)
        .await?;
    Ok(Json(Action::ok("Removed from cart").with_data(CartView::from(Some(cart)))))
}

/// Delete the cart.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Action>> {
    if let Some(owner) = resolve_owner(&session, user.as_ref()).await? {
        CartRepository::new(state.pool(), state.pricing())
            .clear(owner)
            .await?;
    }
    Ok(Json(Action::ok("Cart cleared")))
}
