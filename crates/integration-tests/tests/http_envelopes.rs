//! Status codes and error envelopes from both routers.
//!
//! Every request here is answered before a query runs, so the routers sit
//! on a lazy pool and no database is needed.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_integration_tests::{TEST_CLIENT_IP, admin_app, lazy_pool, storefront_app};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", TEST_CLIENT_IP)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", TEST_CLIENT_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Storefront
// ============================================================================

#[tokio::test]
async fn test_storefront_health() {
    let response = storefront_app(lazy_pool())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_protected_route_redirects_to_sign_in() {
    let response = storefront_app(lazy_pool())
        .oneshot(get("/order/0b7e3c1e-5c56-4c1c-9f0a-7d0f3f1f2a11"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorType"], "UNAUTHENTICATED");
    assert_eq!(
        body["redirectTo"],
        "/sign-in?callbackUrl=%2Forder%2F0b7e3c1e-5c56-4c1c-9f0a-7d0f3f1f2a11"
    );
}

#[tokio::test]
async fn test_profile_requires_sign_in() {
    let response = storefront_app(lazy_pool())
        .oneshot(get("/profile"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["redirectTo"], "/sign-in?callbackUrl=%2Fprofile");
}

#[tokio::test]
async fn test_sign_up_reports_every_invalid_field() {
    let response = storefront_app(lazy_pool())
        .oneshot(post_json(
            "/sign-up",
            &json!({
                "name": "Al",
                "email": "not-an-email",
                "password": "secret1",
                "confirmPassword": "secret2"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["email"], "Invalid email address");
    assert_eq!(body["errors"]["confirmPassword"], "Passwords don't match");
    assert!(body["errors"]["name"].is_string());
}

#[tokio::test]
async fn test_guest_checkout_requires_email_and_address() {
    let response = storefront_app(lazy_pool())
        .oneshot(post_json(
            "/checkout/place-order",
            &json!({ "paymentMethod": "Bitcoin" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"]["paymentMethod"], "Invalid payment method");
    assert_eq!(body["errorType"], "VALIDATION");
    assert_eq!(body["errors"]["email"], "Email is required");
    assert!(body["errors"]["shippingAddress.fullName"].is_string());
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", TEST_CLIENT_IP)
        .body(Body::from("{not json"))
        .unwrap();

    let response = storefront_app(lazy_pool()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cart_edits_without_a_cart_do_not_start_one() {
    let product = "0b7e3c1e-5c56-4c1c-9f0a-7d0f3f1f2a11";
    let set_quantity = Request::builder()
        .method("PUT")
        .uri(format!("/cart/items/{product}"))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", TEST_CLIENT_IP)
        .body(Body::from(json!({ "qty": 2 }).to_string()))
        .unwrap();
    let decrement = post_json(&format!("/cart/items/{product}/decrement"), &json!({}));

    for request in [set_quantity, decrement] {
        let response = storefront_app(lazy_pool()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
        let body = body_json(response).await;
        assert_eq!(body["message"], "Cart not found");
    }
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_health() {
    let response = admin_app(lazy_pool())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    for uri in ["/dashboard", "/orders", "/products", "/users", "/pages"] {
        let response = admin_app(lazy_pool()).oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errorType"], "UNAUTHENTICATED");
        assert!(body.get("redirectTo").is_none());
    }
}

#[tokio::test]
async fn test_admin_mutation_without_session_is_rejected() {
    let response = admin_app(lazy_pool())
        .oneshot(post_json(
            "/orders/0b7e3c1e-5c56-4c1c-9f0a-7d0f3f1f2a11/mark-paid",
            &json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
