//! Route protection by path pattern.
//!
//! Account and order routes require a signed-in user. Anonymous requests are
//! answered with 401 and a `redirectTo` pointing at the sign-in page with the
//! requested path as `callbackUrl`.

use std::sync::LazyLock;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::RegexSet;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Paths that need a signed-in user.
static PROTECTED_PATHS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^/shipping-address",
        r"^/payment-method",
        r"^/profile",
        r"^/user/",
        r"^/order/",
    ])
    .expect("Invalid regex")
});

/// Whether `path` is behind sign-in.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PATHS.is_match(path)
}

/// Reject anonymous requests to protected paths.
pub async fn protect_routes_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !is_protected(path) {
        return next.run(request).await;
    }

    let signed_in = match request.extensions().get::<Session>() {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .is_some(),
        None => false,
    };

    if signed_in {
        next.run(request).await
    } else {
        let callback = request
            .uri()
            .path_and_query()
            .map_or_else(|| path.to_owned(), ToString::to_string);
        AppError::SignInRequired(callback).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_paths() {
        assert!(is_protected("/profile"));
        assert!(is_protected("/user/orders"));
        assert!(is_protected("/order/6f1c2a8e-3b7d-4e52-9a0f-1d2c3b4a5e6f"));
        assert!(is_protected("/shipping-address"));
        assert!(is_protected("/payment-method"));
    }

    #[test]
    fn test_public_paths() {
        assert!(!is_protected("/"));
        assert!(!is_protected("/products"));
        assert!(!is_protected("/cart"));
        assert!(!is_protected("/checkout"));
        assert!(!is_protected("/orders"));
        assert!(!is_protected("/sign-in"));
    }
}
