//! HTTP route handlers for admin.
//!
//! Every route except sign-in requires a signed-in admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /auth/sign-in                 - Sign in (admin role required)
//! POST   /auth/sign-out                - Sign out
//!
//! # Dashboard
//! GET    /dashboard                    - Counts, sales by month, latest orders
//!
//! # Orders
//! GET    /orders                       - Listing (?page=&query=buyer name)
//! GET    /orders/{id}                  - Order with lines and buyer
//! POST   /orders/{id}/mark-paid        - Mark paid and send the receipt
//! POST   /orders/{id}/mark-delivered   - Mark delivered (paid orders only)
//! DELETE /orders/{id}                  - Delete
//!
//! # Catalog
//! GET    /products                     - Listing (?page=&query=name)
//! POST   /products                     - Create
//! GET    /products/{id}                - Detail
//! PUT    /products/{id}                - Update
//! DELETE /products/{id}                - Delete
//! GET    /categories                   - Listing with sub-category counts
//! POST   /categories                   - Create with sub-categories
//! GET    /categories/{id}              - Category with sub-categories
//! PUT    /categories/{id}              - Update, replacing sub-categories
//! DELETE /categories/{id}              - Delete (refused while products use it)
//!
//! # Content
//! GET    /announcements                - All announcements
//! POST   /announcements                - Create
//! PUT    /announcements/{id}           - Update text
//! DELETE /announcements/{id}           - Delete
//! POST   /announcements/{id}/toggle    - Flip active flag
//! GET    /pages                        - CMS pages
//! GET    /pages/{slug}                 - CMS page
//! PUT    /pages/{slug}                 - Update title and content
//!
//! # Users
//! GET    /users                        - Listing (?page=&query=name)
//! PUT    /users/{id}                   - Update name and role
//! DELETE /users/{id}                   - Delete
//! ```

pub mod auth;
pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use bazaar_core::PageRequest;

use crate::state::AppState;

/// Success envelope for actions: `{success: true, message, data?}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action<T: Serialize = ()> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl Action {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> Action<T> {
    #[must_use]
    pub fn with_data<U: Serialize>(self, data: U) -> Action<U> {
        Action {
            success: self.success,
            message: self.message,
            data: Some(data),
        }
    }
}

/// `?page=&query=` for listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub query: Option<String>,
}

impl ListQuery {
    /// The search term; blank and `all` mean no filter.
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty() && *q != "all")
    }

    #[must_use]
    pub fn page(&self) -> PageRequest {
        PageRequest::page(self.page)
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::summary))
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show).delete(orders::delete))
        .route("/orders/{id}/mark-paid", post(orders::mark_paid))
        .route("/orders/{id}/mark-delivered", post(orders::mark_delivered))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/{id}",
            get(catalog::show_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            get(catalog::show_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/announcements",
            get(content::list_announcements).post(content::create_announcement),
        )
        .route(
            "/announcements/{id}",
            put(content::update_announcement).delete(content::delete_announcement),
        )
        .route(
            "/announcements/{id}/toggle",
            post(content::toggle_announcement),
        )
        .route("/pages", get(content::list_pages))
        .route("/pages/{slug}", get(content::show_page).put(content::update_page))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list))
        .route("/users/{id}", put(users::update).delete(users::delete))
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(order_routes())
        .merge(catalog_routes())
        .merge(content_routes())
        .merge(user_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_term() {
        let query = |q: Option<&str>| ListQuery {
            page: None,
            query: q.map(str::to_owned),
        };
        assert_eq!(query(Some(" ali ")).term(), Some("ali"));
        assert_eq!(query(Some("all")).term(), None);
        assert_eq!(query(Some("  ")).term(), None);
        assert_eq!(query(None).term(), None);
    }
}
