//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /products                     - Filtered, sorted, paginated listing
//! GET    /products/latest              - Newest 6
//! GET    /products/featured            - Featured 4
//! GET    /products/deal                - Running deal, if any
//! GET    /products/{slug}              - Product with category and sub-category
//! GET    /products/{slug}/related      - Up to 4 from the same category
//! GET    /categories                   - Navigation tree
//! GET    /categories/homepage          - Homepage grid
//! GET    /categories/{slug}            - Category with sub-categories
//!
//! # Content
//! GET    /announcements                - Active announcements
//! GET    /pages/{slug}                 - CMS page
//!
//! # Cart
//! GET    /cart                         - Current cart
//! DELETE /cart                         - Clear cart
//! POST   /cart/items                   - Add a product
//! PUT    /cart/items/{product_id}      - Set a line quantity
//! POST   /cart/items/{product_id}/decrement - Remove one unit
//!
//! # Checkout
//! GET    /checkout                     - Cart, saved address and payment options
//! POST   /checkout/place-order         - Place an order (guest or signed in)
//!
//! # Orders (signed in)
//! GET    /order/{id}                   - Order detail
//! GET    /user/orders                  - Order history
//!
//! # Account (signed in)
//! GET    /profile                      - Profile
//! POST   /profile                      - Update name
//! POST   /shipping-address             - Save address
//! POST   /payment-method               - Save payment method
//!
//! # Auth
//! POST   /sign-up                      - Register and sign in
//! POST   /sign-in                      - Sign in
//! POST   /sign-out                     - Sign out
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod orders;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::middleware::{api_rate_limiter, auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Success envelope for actions: `{success: true, message, redirectTo?, data?}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action<T: Serialize = ()> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl Action {
    /// A bare success with a message.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_to: None,
            data: None,
        }
    }
}

impl<T: Serialize> Action<T> {
    /// Attach a payload.
    #[must_use]
    pub fn with_data<U: Serialize>(self, data: U) -> Action<U> {
        Action {
            success: self.success,
            message: self.message,
            redirect_to: self.redirect_to,
            data: Some(data),
        }
    }

    /// Tell the client where to go next.
    #[must_use]
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/latest", get(catalog::latest))
        .route("/products/featured", get(catalog::featured))
        .route("/products/deal", get(catalog::deal))
        .route("/products/{slug}", get(catalog::show_product))
        .route("/products/{slug}/related", get(catalog::related))
        .route("/categories", get(catalog::category_tree))
        .route("/categories/homepage", get(catalog::homepage_categories))
        .route("/categories/{slug}", get(catalog::show_category))
        .route("/announcements", get(content::announcements))
        .route("/pages/{slug}", get(content::page))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route("/cart/items/{product_id}", put(cart::set_quantity))
        .route("/cart/items/{product_id}/decrement", post(cart::decrement))
        .route_layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::show))
        .route(
            "/checkout/place-order",
            post(checkout::place_order).route_layer(checkout_rate_limiter()),
        )
}

/// Create the order and account routes router.
///
/// Every path here is also listed in the route-protection patterns.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/order/{id}", get(orders::show))
        .route("/user/orders", get(orders::list))
        .route("/profile", get(account::profile).post(account::update_profile))
        .route("/shipping-address", post(account::update_shipping_address))
        .route("/payment-method", post(account::update_payment_method))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route_layer(auth_rate_limiter())
        .route("/sign-out", post(auth::sign_out))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(cart_routes())
        .merge(checkout_routes())
        .merge(account_routes())
        .merge(auth_routes())
}
