//! Back-office order handling and admin access against a real database.
//!
//! These tests require a reachable `PostgreSQL` server in `DATABASE_URL`.
//!
//! Run with: cargo test -p bazaar-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use std::io;
use std::sync::{Arc, Mutex};

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

use bazaar_admin::db::OrderRepository;
use bazaar_admin::db::orders::FulfillmentError;
use bazaar_core::PricingPolicy;
use bazaar_integration_tests::{
    admin_app, client, insert_product, insert_user, migrate_sessions, place_guest_order, spawn,
};
use bazaar_storefront::db::CartRepository;
use bazaar_storefront::models::CartOwner;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct-horse";

/// Spawn the admin app and return a client signed in as a fresh admin.
async fn signed_in_admin(pool: &PgPool) -> (String, Client, bazaar_core::UserId) {
    migrate_sessions(pool).await;
    let admin_id = insert_user(pool, ADMIN_EMAIL, ADMIN_PASSWORD, true).await;
    let base_url = spawn(admin_app(pool.clone())).await;
    let http = client();

    let resp = http
        .post(format!("{base_url}/auth/sign-in"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    (base_url, http, admin_id)
}

/// Log output collected in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn count(&self, message: &str) -> usize {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .matches(message)
            .count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ============================================================================
// Orders
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_mark_paid_is_idempotent(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(185_000, 2), 4).await;
    let order_id = place_guest_order(&pool, product, 1, "buyer@example.com").await;
    let orders = OrderRepository::new(&pool);

    let first = orders.mark_paid(order_id).await.unwrap();
    assert!(first.newly_paid);
    assert!(first.order.order.is_paid);
    let paid_at = first.order.order.paid_at;
    assert!(paid_at.is_some());

    let second = orders.mark_paid(order_id).await.unwrap();
    assert!(!second.newly_paid);
    assert!(second.order.order.is_paid);
    assert_eq!(second.order.order.paid_at, paid_at);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_delivery_requires_payment(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(185_000, 2), 4).await;
    let order_id = place_guest_order(&pool, product, 2, "buyer@example.com").await;
    let orders = OrderRepository::new(&pool);

    assert!(matches!(
        orders.mark_delivered(order_id).await,
        Err(FulfillmentError::NotPaid)
    ));

    orders.mark_paid(order_id).await.unwrap();
    let delivered = orders.mark_delivered(order_id).await.unwrap();
    assert!(delivered.order.is_delivered);
    assert!(delivered.order.delivered_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_mark_paid_over_http(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(65_000, 2), 4).await;
    let order_id = place_guest_order(&pool, product, 1, "buyer@example.com").await;
    let (base_url, http, _) = signed_in_admin(&pool).await;

    let resp = http
        .post(format!("{base_url}/orders/{order_id}/mark-delivered"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = http
        .post(format!("{base_url}/orders/{order_id}/mark-paid"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Order has been marked paid");

    let order: Value = http
        .get(format!("{base_url}/orders/{order_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["isPaid"], true);
    assert_eq!(order["buyerEmail"], "buyer@example.com");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_fulfillment_is_logged_once_per_transition(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(65_000, 2), 4).await;
    let order_id = place_guest_order(&pool, product, 1, "buyer@example.com").await;
    let (base_url, http, _) = signed_in_admin(&pool).await;

    // sqlx tests run on a current-thread runtime, so the server task logs here.
    let logs = CapturedLogs::default();
    let _guard = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish()
        .set_default();

    for action in ["mark-paid", "mark-delivered"] {
        let resp = http
            .post(format!("{base_url}/orders/{order_id}/{action}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{action}");
    }

    assert_eq!(logs.count("Order marked paid"), 1);
    assert_eq!(logs.count("Order marked delivered"), 1);
}

// ============================================================================
// Catalog
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_product_delete_reprices_carts(pool: PgPool) {
    let kept = insert_product(&pool, Decimal::new(100_000, 2), 5).await;
    let deleted = insert_product(&pool, Decimal::new(50_000, 2), 5).await;
    let owner = CartOwner::Session(uuid::Uuid::new_v4());
    let carts = CartRepository::new(&pool, PricingPolicy::default());
    carts.add_item(owner, kept, 1).await.unwrap();
    carts.add_item(owner, deleted, 1).await.unwrap();
    let (base_url, http, _) = signed_in_admin(&pool).await;

    let resp = http
        .delete(format!("{base_url}/products/{deleted}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (items, shipping, total): (Decimal, Decimal, Decimal) =
        sqlx::query_as("SELECT items_price, shipping_price, total_price FROM carts")
            .fetch_one(&pool)
            .await
            .unwrap();
    let lines: Decimal = sqlx::query_scalar("SELECT SUM(price * qty) FROM cart_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, lines);
    assert_eq!(items, Decimal::new(100_000, 2));
    assert_eq!(total, items + shipping);
}

// ============================================================================
// Access
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_customer_cannot_sign_in_to_admin(pool: PgPool) {
    migrate_sessions(&pool).await;
    insert_user(&pool, "shopper@example.com", "secret123", false).await;
    let base_url = spawn(admin_app(pool.clone())).await;

    let resp = client()
        .post(format!("{base_url}/auth/sign-in"))
        .json(&json!({ "email": "shopper@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorType"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_cannot_demote_self(pool: PgPool) {
    let (base_url, http, admin_id) = signed_in_admin(&pool).await;

    let resp = http
        .put(format!("{base_url}/users/{admin_id}"))
        .json(&json!({ "name": "Bilal Ahmed", "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let role: String = sqlx::query_scalar("SELECT role::text FROM users WHERE id = $1")
        .bind(admin_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(role, "admin");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_category_with_products_cannot_be_deleted(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(65_000, 2), 4).await;
    let category_id: uuid::Uuid =
        sqlx::query_scalar("SELECT category_id FROM products WHERE id = $1")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
    let (base_url, http, _) = signed_in_admin(&pool).await;

    let resp = http
        .delete(format!("{base_url}/categories/{category_id}"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Category has products and cannot be deleted");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_dashboard_counts(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(100_000, 2), 4).await;
    place_guest_order(&pool, product, 1, "buyer@example.com").await;
    let (base_url, http, _) = signed_in_admin(&pool).await;

    let summary: Value = http
        .get(format!("{base_url}/dashboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary["ordersCount"], 1);
    assert_eq!(summary["productsCount"], 1);
    // The guest buyer and the admin.
    assert_eq!(summary["usersCount"], 2);
    assert_eq!(summary["latestSales"].as_array().unwrap().len(), 1);
}
