//! Authentication route handlers.
//!
//! Sign-up, sign-in and sign-out. Signing in by either route adopts the
//! visitor's anonymous cart into their account.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::CartRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::Action;
use crate::services::auth::{AuthService, SignInForm, SignUpForm};
use crate::services::cart::{anonymous_token, take_token};
use crate::state::AppState;

/// Only same-site paths are followed after sign-in.
fn safe_callback(callback_url: Option<&str>) -> String {
    match callback_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => {
            url.to_owned()
        }
        _ => "/".to_owned(),
    }
}

/// Put `user` in the session and fold in any anonymous cart.
///
/// The anonymous token is dropped only once its cart has been merged; after a
/// failed merge it stays in the session and the next sign-in retries.
async fn start_session(
    state: &AppState,
    session: &Session,
    user: &User,
    remember_me: bool,
) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user), remember_me).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let Some(token) = anonymous_token(session).await? else {
        return Ok(());
    };
    match CartRepository::new(state.pool(), state.pricing())
        .merge_on_login(token, user.id)
        .await
    {
        Ok(_) => {
            take_token(session).await?;
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to merge anonymous cart");
        }
    }
    Ok(())
}

/// Register with a password and sign in.
#[instrument(skip(state, session, form))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    extract::Json(form): extract::Json<SignUpForm>,
) -> Result<Json<Action>> {
    let user = AuthService::new(state.pool()).sign_up(&form).await?;
    start_session(&state, &session, &user, false).await?;

    Ok(Json(Action::ok("User registered successfully").redirect_to("/")))
}

/// Sign in with e-mail and password.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    extract::Json(form): extract::Json<SignInForm>,
) -> Result<Json<Action>> {
    let user = AuthService::new(state.pool())
        .sign_in(&form.email, &form.password)
        .await?;
    start_session(&state, &session, &user, form.remember_me).await?;

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(
        Action::ok("Signed in successfully").redirect_to(safe_callback(form.callback_url.as_deref())),
    ))
}

/// Sign out, dropping the session and anything stored in it.
#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> Result<Json<Action>> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Json(Action::ok("Signed out successfully").redirect_to("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_callback_keeps_local_paths() {
        assert_eq!(safe_callback(Some("/order/abc?x=1")), "/order/abc?x=1");
    }

    #[test]
    fn test_safe_callback_rejects_foreign_targets() {
        assert_eq!(safe_callback(Some("https://evil.example")), "/");
        assert_eq!(safe_callback(Some("//evil.example")), "/");
        assert_eq!(safe_callback(Some("/\\evil.example")), "/");
        assert_eq!(safe_callback(None), "/");
    }
}
