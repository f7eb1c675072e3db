//! Dashboard overview.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::DashboardRepository;
use crate::db::dashboard::Summary;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn summary(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Summary>> {
    let summary = DashboardRepository::new(state.pool()).summary().await?;
    Ok(Json(summary))
}
