//! Checkout route handlers.
//!
//! Guests and signed-in users share one place-order flow. A guest checkout
//! creates a password-less account for the submitted e-mail and signs the
//! guest in for the rest of the browser session.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{OrderId, PaymentMethod, ShippingAddress, Totals};

use crate::db::{CartRepository, OrderRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb, set_sentry_user};
use crate::extract;
use crate::middleware::{OptionalAuth, set_current_user};
use crate::models::CurrentUser;
use crate::routes::Action;
use crate::routes::cart::CartView;
use crate::services::cart::{resolve_owner, take_token};
use crate::services::checkout::{Buyer, CheckoutError, NewOrder, PlaceOrderForm};
use crate::state::AppState;

/// Checkout page payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub cart: CartView,
    pub is_guest: bool,
    pub saved_address: Option<ShippingAddress>,
    pub saved_payment_method: Option<PaymentMethod>,
    pub payment_methods: [PaymentMethod; 3],
    pub default_payment_method: PaymentMethod,
}

/// Data returned after a successful placement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrderView {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Everything the checkout form needs.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutView>> {
    let cart = match resolve_owner(&session, user.as_ref()).await? {
        Some(owner) => {
            CartRepository::new(state.pool(), state.pricing())
                .find(owner)
                .await?
        }
        None => None,
    };

    let saved = match &user {
        Some(current) => UserRepository::new(state.pool()).get_by_id(current.id).await?,
        None => None,
    };

    Ok(Json(CheckoutView {
        cart: CartView::from(cart),
        is_guest: user.is_none(),
        saved_address: saved.as_ref().and_then(|u| u.address.clone()),
        saved_payment_method: saved.as_ref().and_then(|u| u.payment_method),
        payment_methods: PaymentMethod::ALL,
        default_payment_method: PaymentMethod::default(),
    }))
}

/// Place an order from the visitor's cart.
#[instrument(skip(state, session, user, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    extract::Json(form): extract::Json<PlaceOrderForm>,
) -> Result<Json<Action<PlacedOrderView>>> {
    let valid = form
        .validate(user.is_none())
        .map_err(CheckoutError::Validation)?;

    let owner = resolve_owner(&session, user.as_ref())
        .await?
        .ok_or(CheckoutError::EmptyCart)?;
    let has_items = CartRepository::new(state.pool(), state.pricing())
        .find(owner)
        .await?
        .is_some_and(|cart| !cart.is_empty());
    if !has_items {
        return Err(CheckoutError::EmptyCart.into());
    }

    let buyer = match (&user, valid.guest_email.as_ref()) {
        (Some(current), _) => Buyer::Member(current.id),
        (None, Some(email)) => {
            if UserRepository::new(state.pool())
                .exists_by_email(email)
                .await?
            {
                return Err(CheckoutError::AccountExists.into());
            }
            Buyer::Guest { email }
        }
        (None, None) => {
            return Err(AppError::Internal(
                "guest checkout passed validation without an e-mail".to_owned(),
            ));
        }
    };

    let placed = OrderRepository::new(state.pool())
        .place_order(
            NewOrder {
                cart: owner,
                buyer,
                shipping_address: &valid.shipping_address,
                payment_method: valid.payment_method,
            },
            &state.pricing(),
        )
        .await?;

    take_token(&session).await?;
    if let Some(guest) = &placed.guest {
        set_current_user(&session, &CurrentUser::from(guest), false).await?;
        set_sentry_user(&guest.id, Some(guest.email.as_str()));
    }

    let order_id = placed.order_id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok(Json(
        Action::ok("Order placed successfully")
            .redirect_to(format!("/order/{}", placed.order_id))
            .with_data(PlacedOrderView {
                order_id: placed.order_id,
                totals: placed.totals,
            }),
    ))
}
