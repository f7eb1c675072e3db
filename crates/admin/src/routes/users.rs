//! User administration.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{FieldErrors, Paginated, UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result, not_found};
use crate::extract;
use crate::middleware::RequireAdmin;
use crate::models::AdminUser;
use crate::routes::{Action, ListQuery};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct UserForm {
    pub name: String,
    pub role: String,
}

impl UserForm {
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> std::result::Result<(&str, UserRole), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("name", &self.name, 3, "Name");
        let role = self.role.trim().parse::<UserRole>();
        if role.is_err() {
            errors.add("role", "Role must be admin or user");
        }
        errors.into_result()?;

        role.map(|role| (self.name.trim(), role)).map_err(|message| {
            let mut errors = FieldErrors::new();
            errors.add("role", message);
            errors
        })
    }
}

#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<AdminUser>>> {
    let users = UserRepository::new(state.pool())
        .list(query.term(), query.page())
        .await?;
    Ok(Json(users))
}

/// Update a user's name and role.
///
/// Admins cannot demote themselves.
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    extract::Json(form): extract::Json<UserForm>,
) -> Result<Json<Action<AdminUser>>> {
    let (name, role) = form.validate()?;
    if id == admin.id && !role.is_admin() {
        return Err(AppError::Forbidden(
            "You cannot remove your own admin role".to_owned(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .update(id, name, role)
        .await
        .map_err(not_found("User"))?;

    tracing::info!(user_id = %id, role = %role, "User updated");
    Ok(Json(Action::ok("User updated successfully").with_data(user)))
}

/// Delete a user with their cart and orders.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Action>> {
    if id == admin.id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_owned(),
        ));
    }

    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("User"))?;

    tracing::info!(user_id = %id, "User deleted");
    Ok(Json(Action::ok("User deleted successfully")))
}
