//! Account route handlers.
//!
//! Profile name, saved shipping address and preferred payment method.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{FieldErrors, PaymentMethod, ShippingAddress};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract;
use crate::models::{CurrentUser, User, session_keys};
use crate::middleware::RequireAuth;
use crate::routes::Action;
use crate::services::auth::MIN_NAME_LENGTH;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodForm {
    pub payment_method: String,
}

/// A missing row for a signed-in user means the account was deleted.
fn account_gone(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("User".to_owned()),
        other => AppError::Database(other),
    }
}

/// The signed-in user's account.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User".to_owned()))
}

/// Rename the signed-in user.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    extract::Json(form): extract::Json<ProfileForm>,
) -> Result<Json<Action>> {
    let name = form.name.trim();
    let mut errors = FieldErrors::new();
    errors.min_len("name", name, MIN_NAME_LENGTH, "Name");
    errors.into_result().map_err(AppError::Validation)?;

    let updated = UserRepository::new(state.pool())
        .update_name(user.id, name)
        .await
        .map_err(account_gone)?;

    // Keep the session copy in step without rotating the session id.
    session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(&updated))
        .await?;

    Ok(Json(Action::ok("User updated successfully")))
}

/// Save the shipping address used to prefill checkout.
#[instrument(skip(state, user, address), fields(user_id = %user.id))]
pub async fn update_shipping_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    extract::Json(address): extract::Json<ShippingAddress>,
) -> Result<Json<Action>> {
    let address = address.trimmed();
    address.validate().map_err(AppError::Validation)?;

    UserRepository::new(state.pool())
        .update_address(user.id, &address)
        .await
        .map_err(account_gone)?;

    Ok(Json(
        Action::ok("User updated successfully").redirect_to("/payment-method"),
    ))
}

/// Save the preferred payment method.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_payment_method(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    extract::Json(form): extract::Json<PaymentMethodForm>,
) -> Result<Json<Action>> {
    let method = form.payment_method.trim().parse::<PaymentMethod>().map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.add("paymentMethod", "Invalid payment method");
        AppError::Validation(errors)
    })?;

    UserRepository::new(state.pool())
        .update_payment_method(user.id, method)
        .await
        .map_err(account_gone)?;

    Ok(Json(
        Action::ok("User updated successfully").redirect_to("/checkout"),
    ))
}
