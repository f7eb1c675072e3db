//! Admin sign-in and sign-out.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract;
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::Action;
use crate::services::AdminAuthService;
use crate::services::auth::SignInForm;
use crate::state::AppState;

/// Sign in with e-mail and password; the account must be an admin.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    extract::Json(form): extract::Json<SignInForm>,
) -> Result<Json<Action<CurrentAdmin>>> {
    let user = AdminAuthService::new(state.pool())
        .sign_in(&form.email, &form.password)
        .await?;

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));

    tracing::info!(admin_id = %admin.id, "Admin signed in");
    Ok(Json(Action::ok("Signed in successfully").with_data(admin)))
}

#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> Result<Json<Action>> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Json(Action::ok("Signed out successfully")))
}
