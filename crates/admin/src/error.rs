//! Unified error handling for admin.
//!
//! Failures use the same JSON envelope as the storefront:
//! `{ "success": false, "message": "...", "errorType"?: "...", "errors"?: {} }`.

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
use crate::db::orders::FulfillmentError;
use crate::services::AdminAuthError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Sign-in failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// Paid/delivered toggle failed.
    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Payload fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No admin signed in.
    #[error("Unauthorized")]
    Unauthorized,

    /// Admin lacks permission for this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl ErrorBody {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_type: None,
            errors: None,
        }
    }

    const fn error_type(mut self, error_type: &'static str) -> Self {
        self.error_type = Some(error_type);
        self
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(e) => !matches!(
                e,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Auth(e) => matches!(
                e,
                AdminAuthError::Repository(_) | AdminAuthError::PasswordHash
            ),
            Self::Fulfillment(e) => matches!(e, FulfillmentError::Repository(_)),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        if self.is_server_error() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error"),
            );
        }

        match self {
            Self::Database(RepositoryError::Conflict(msg)) => {
                (StatusCode::CONFLICT, ErrorBody::new(msg))
            }
            Self::Database(_) => (StatusCode::NOT_FOUND, ErrorBody::new("Not found")),
            Self::Auth(AdminAuthError::NotAdmin) => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("Admin access required").error_type("FORBIDDEN"),
            ),
            Self::Auth(err) => (StatusCode::UNAUTHORIZED, ErrorBody::new(err.to_string())),
            Self::Fulfillment(err) => {
                let status = match err {
                    FulfillmentError::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, ErrorBody::new(err.to_string()))
            }
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errors: Some(errors),
                    ..ErrorBody::new("Please fix the highlighted fields").error_type("VALIDATION")
                },
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(format!("{what} not found")),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("Please sign in to continue").error_type("UNAUTHENTICATED"),
            ),
            Self::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(msg).error_type("FORBIDDEN"),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            Self::Session(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Map a missing row to a named 404.
pub fn not_found(what: &'static str) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(what.to_owned()),
        other => AppError::Database(other),
    }
}

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(admin_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
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
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::Auth(AdminAuthError::NotAdmin)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Fulfillment(FulfillmentError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict(
                "Category has products and cannot be deleted".to_owned()
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_not_paid_envelope() {
        let (status, body) = body_json(AppError::Fulfillment(FulfillmentError::NotPaid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Order is not paid");
    }

    #[tokio::test]
    async fn test_conflict_message_is_shown() {
        let (_, body) = body_json(AppError::Database(RepositoryError::Conflict(
            "Product slug already exists".to_owned(),
        )))
        .await;
        assert_eq!(body["message"], "Product slug already exists");
    }

    #[tokio::test]
    async fn test_database_details_are_hidden() {
        let (status, body) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "bad email".to_owned(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
