//! Order placement against a real database.
//!
//! These tests require a reachable `PostgreSQL` server in `DATABASE_URL`;
//! `sqlx::test` creates and migrates a scratch database for each one.
//!
//! Run with: cargo test -p bazaar-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use bazaar_core::{PaymentMethod, PricingPolicy};
use bazaar_integration_tests::{
    client, insert_product, insert_user, migrate_sessions, place_guest_order, shipping_address,
    shipping_address_json, spawn, storefront_app,
};
use bazaar_storefront::db::orders::{Buyer, CheckoutError, NewOrder};
use bazaar_storefront::db::{CartRepository, OrderRepository};
use bazaar_storefront::models::CartOwner;

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Through the HTTP API
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_guest_checkout_matches_cart_and_clears_it(pool: PgPool) {
    migrate_sessions(&pool).await;
    let product = insert_product(&pool, Decimal::new(100_000, 2), 5).await;
    let base_url = spawn(storefront_app(pool.clone())).await;
    let http = client();

    let resp = http
        .post(format!("{base_url}/cart/items"))
        .json(&json!({ "productId": product, "qty": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = http
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["itemCount"], 2);

    let resp = http
        .post(format!("{base_url}/checkout/place-order"))
        .json(&json!({
            "shippingAddress": shipping_address_json(),
            "paymentMethod": "JazzCash",
            "email": "ayesha@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(placed["success"], true);
    for field in ["itemsPrice", "shippingPrice", "taxPrice", "totalPrice"] {
        assert_eq!(placed["data"][field], cart[field], "{field}");
    }

    // The cart is gone and the guest is now signed in to see the order.
    let cart: Value = http
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["itemCount"], 0);
    assert_eq!(count(&pool, "carts").await, 0);

    let order_id = placed["data"]["orderId"].as_str().unwrap();
    let resp = http
        .get(format!("{base_url}/order/{order_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["buyerEmail"], "ayesha@example.com");
    assert_eq!(order["lines"].as_array().unwrap().len(), 1);

    let stock: i32 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 3);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_places_no_order(pool: PgPool) {
    migrate_sessions(&pool).await;
    let base_url = spawn(storefront_app(pool.clone())).await;

    let resp = client()
        .post(format!("{base_url}/checkout/place-order"))
        .json(&json!({
            "shippingAddress": shipping_address_json(),
            "paymentMethod": "CashOnDelivery",
            "email": "nobody@example.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorType"], "EMPTY_CART");
    assert_eq!(body["redirectTo"], "/cart");
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "users").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_guest_with_registered_email_must_sign_in(pool: PgPool) {
    migrate_sessions(&pool).await;
    insert_user(&pool, "bilal@example.com", "secret123", false).await;
    let product = insert_product(&pool, Decimal::new(65_000, 2), 5).await;
    let base_url = spawn(storefront_app(pool.clone())).await;
    let http = client();

    http.post(format!("{base_url}/cart/items"))
        .json(&json!({ "productId": product }))
        .send()
        .await
        .unwrap();

    let resp = http
        .post(format!("{base_url}/checkout/place-order"))
        .json(&json!({
            "shippingAddress": shipping_address_json(),
            "paymentMethod": "BankDeposit",
            "email": "Bilal@Example.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorType"], "ACCOUNT_EXISTS");
    assert_eq!(count(&pool, "users").await, 1);
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "cart_items").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_anonymous_cart_merges_on_sign_in(pool: PgPool) {
    migrate_sessions(&pool).await;
    insert_user(&pool, "bilal@example.com", "secret123", false).await;
    let product = insert_product(&pool, Decimal::new(65_000, 2), 10).await;
    let base_url = spawn(storefront_app(pool.clone())).await;
    let http = client();

    http.post(format!("{base_url}/cart/items"))
        .json(&json!({ "productId": product, "qty": 3 }))
        .send()
        .await
        .unwrap();

    let resp = http
        .post(format!("{base_url}/sign-in"))
        .json(&json!({ "email": "bilal@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = http
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["itemCount"], 3);
    assert_eq!(count(&pool, "carts").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_signed_in_checkout_saves_address_and_payment_method(pool: PgPool) {
    migrate_sessions(&pool).await;
    let user_id = insert_user(&pool, "bilal@example.com", "secret123", false).await;
    let product = insert_product(&pool, Decimal::new(65_000, 2), 5).await;
    let base_url = spawn(storefront_app(pool.clone())).await;
    let http = client();

    let resp = http
        .post(format!("{base_url}/sign-in"))
        .json(&json!({ "email": "bilal@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    http.post(format!("{base_url}/cart/items"))
        .json(&json!({ "productId": product, "qty": 2 }))
        .send()
        .await
        .unwrap();

    // No e-mail: the signed-in account is the buyer.
    let resp = http
        .post(format!("{base_url}/checkout/place-order"))
        .json(&json!({
            "shippingAddress": shipping_address_json(),
            "paymentMethod": "BankDeposit"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(placed["data"]["itemsPrice"], "1300.00");
    assert_eq!(placed["data"]["totalPrice"], "1550.00");

    let owner: uuid::Uuid = sqlx::query_scalar("SELECT user_id FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(owner, user_id.as_uuid());
    assert_eq!(count(&pool, "users").await, 1);
    assert_eq!(count(&pool, "carts").await, 0);

    let checkout: Value = http
        .get(format!("{base_url}/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(checkout["isGuest"], false);
    assert_eq!(checkout["savedPaymentMethod"], "BankDeposit");
    assert_eq!(checkout["savedAddress"]["city"], "Faisalabad");
    assert_eq!(checkout["cart"]["itemCount"], 0);

    let orders: Value = http
        .get(format!("{base_url}/user/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders["count"], 1);
    assert_eq!(orders["data"][0]["id"], placed["data"]["orderId"]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_returning_guest_claims_account_by_signing_up(pool: PgPool) {
    migrate_sessions(&pool).await;
    let product = insert_product(&pool, Decimal::new(65_000, 2), 5).await;
    let order_id = place_guest_order(&pool, product, 1, "ayesha@example.com").await;
    let base_url = spawn(storefront_app(pool.clone())).await;

    let sign_up = json!({
        "name": "Ayesha Khan",
        "email": "Ayesha@Example.com",
        "password": "secret123",
        "confirmPassword": "secret123"
    });
    let resp = client()
        .post(format!("{base_url}/sign-up"))
        .json(&sign_up)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(count(&pool, "users").await, 1);

    let name: String = sqlx::query_scalar("SELECT name FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Ayesha Khan");

    // The password now works from a fresh browser, and the guest order is theirs.
    let http = client();
    let resp = http
        .post(format!("{base_url}/sign-in"))
        .json(&json!({ "email": "ayesha@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let orders: Value = http
        .get(format!("{base_url}/user/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders["count"], 1);
    assert_eq!(orders["data"][0]["id"], order_id.to_string());

    // Once a password is set the e-mail is taken.
    let resp = client()
        .post(format!("{base_url}/sign-up"))
        .json(&sign_up)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorType"], "ACCOUNT_EXISTS");
    assert_eq!(count(&pool, "user_passwords").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_cart_merge_is_retried_on_next_sign_in(pool: PgPool) {
    migrate_sessions(&pool).await;
    insert_user(&pool, "bilal@example.com", "secret123", false).await;
    let product = insert_product(&pool, Decimal::new(65_000, 2), 10).await;
    let base_url = spawn(storefront_app(pool.clone())).await;
    let http = client();

    http.post(format!("{base_url}/cart/items"))
        .json(&json!({ "productId": product, "qty": 2 }))
        .send()
        .await
        .unwrap();

    // Adopting the anonymous cart updates its row; make that fail once.
    sqlx::query(
        "CREATE FUNCTION reject_cart_update() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'cart updates disabled'; END $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_cart_update BEFORE UPDATE ON carts \
         FOR EACH ROW EXECUTE FUNCTION reject_cart_update()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let sign_in = json!({ "email": "bilal@example.com", "password": "secret123" });
    let resp = http
        .post(format!("{base_url}/sign-in"))
        .json(&sign_in)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE user_id IS NOT NULL")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(owned, 0);

    sqlx::query("DROP TRIGGER reject_cart_update ON carts")
        .execute(&pool)
        .await
        .unwrap();

    let resp = http
        .post(format!("{base_url}/sign-in"))
        .json(&sign_in)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = http
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["itemCount"], 2);
    assert_eq!(count(&pool, "carts").await, 1);
}

// ============================================================================
// Through the repository
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_stock_shortfall_rolls_back_everything(pool: PgPool) {
    let product = insert_product(&pool, Decimal::new(240_000, 2), 2).await;
    let owner = CartOwner::Session(uuid::Uuid::new_v4());
    let policy = PricingPolicy::default();
    CartRepository::new(&pool, policy)
        .add_item(owner, product, 2)
        .await
        .unwrap();

    // Someone else bought one in the meantime.
    sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
        .bind(product)
        .execute(&pool)
        .await
        .unwrap();

    let email = bazaar_core::Email::parse("late@example.com").unwrap();
    let address = shipping_address();
    let result = OrderRepository::new(&pool)
        .place_order(
            NewOrder {
                cart: owner,
                buyer: Buyer::Guest { email: &email },
                shipping_address: &address,
                payment_method: PaymentMethod::CashOnDelivery,
            },
            &policy,
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::Unavailable(_))));
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "users").await, 0);
    assert_eq!(count(&pool, "cart_items").await, 1);
}
