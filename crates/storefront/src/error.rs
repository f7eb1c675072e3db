//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every failure is rendered as the same JSON envelope:
//!
//! ```json
//! { "success": false, "message": "...", "errorType": "...", "redirectTo": "...", "errors": {} }
//! ```
//!
//! `errorType`, `redirectTo` and `errors` are omitted when not relevant.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use bazaar_core::FieldErrors;

use crate::db::RepositoryError;
use crate::db::carts::CartError;
use crate::db::orders::CheckoutError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart mutation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Payload fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Sign-in needed; carries the path to return to afterwards.
    #[error("Sign in required for {0}")]
    SignInRequired(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// The JSON failure envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl ErrorBody {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_type: None,
            redirect_to: None,
            errors: None,
        }
    }

    const fn error_type(mut self, error_type: &'static str) -> Self {
        self.error_type = Some(error_type);
        self
    }

    fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    fn validation(errors: FieldErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Self::new("Please fix the highlighted fields").error_type("VALIDATION")
        }
    }

    fn internal() -> Self {
        Self::new("Internal server error")
    }
}

/// `/sign-in?callbackUrl=<path>` with the path form-encoded.
#[must_use]
pub fn sign_in_redirect(path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/sign-in?callbackUrl={encoded}")
}

impl AppError {
    /// Whether this error is a server fault that should reach Sentry.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(e) => !matches!(
                e,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Auth(e) => matches!(e, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Cart(e) => matches!(e, CartError::Repository(_)),
            Self::Checkout(e) => matches!(e, CheckoutError::Repository(_)),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        if self.is_server_error() {
            return (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal());
        }

        match self {
            Self::Database(RepositoryError::Conflict(msg)) => {
                (StatusCode::CONFLICT, ErrorBody::new(msg))
            }
            Self::Database(_) => (StatusCode::NOT_FOUND, ErrorBody::new("Not found")),
            Self::Auth(err) => match err {
                AuthError::Validation(errors) => {
                    (StatusCode::BAD_REQUEST, ErrorBody::validation(errors))
                }
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, ErrorBody::new("Invalid email address"))
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    ErrorBody::new(err.to_string()).error_type("ACCOUNT_EXISTS"),
                ),
                _ => (StatusCode::UNAUTHORIZED, ErrorBody::new(err.to_string())),
            },
            Self::Cart(err) => {
                let status = match err {
                    CartError::ProductNotFound | CartError::CartNotFound | CartError::NotInCart => {
                        StatusCode::NOT_FOUND
                    }
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, ErrorBody::new(err.to_string()))
            }
            Self::Checkout(err) => match err {
                CheckoutError::Validation(errors) => {
                    (StatusCode::BAD_REQUEST, ErrorBody::validation(errors))
                }
                CheckoutError::EmptyCart => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new(err.to_string())
                        .error_type("EMPTY_CART")
                        .redirect_to("/cart"),
                ),
                CheckoutError::AccountExists => (
                    StatusCode::CONFLICT,
                    ErrorBody::new(err.to_string()).error_type("ACCOUNT_EXISTS"),
                ),
                _ => (
                    StatusCode::CONFLICT,
                    ErrorBody::new(err.to_string())
                        .error_type("OUT_OF_STOCK")
                        .redirect_to("/cart"),
                ),
            },
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, ErrorBody::validation(errors)),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, ErrorBody::new(format!("{what} not found"))),
            Self::SignInRequired(path) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("Please sign in to continue")
                    .error_type("UNAUTHENTICATED")
                    .redirect_to(sign_in_redirect(&path)),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::new("Too many requests, please try again later"),
            ),
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product".to_string());
        assert_eq!(err.to_string(), "Not found: Product");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::SignInRequired("/profile".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::InsufficientStock { available: 1 })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_empty_cart_envelope() {
        let (status, body) = body_json(AppError::Checkout(CheckoutError::EmptyCart)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Your cart is empty");
        assert_eq!(body["redirectTo"], "/cart");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_account_exists_envelope() {
        let (status, body) = body_json(AppError::Checkout(CheckoutError::AccountExists)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorType"], "ACCOUNT_EXISTS");
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.add("shippingAddress.city", "City must be at least 3 characters");
        let (status, body) = body_json(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "VALIDATION");
        assert_eq!(
            body["errors"]["shippingAddress.city"],
            "City must be at least 3 characters"
        );
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let (_, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_sign_in_redirect_encodes_path() {
        assert_eq!(
            sign_in_redirect("/order/abc?x=1"),
            "/sign-in?callbackUrl=%2Forder%2Fabc%3Fx%3D1"
        );
    }
}
