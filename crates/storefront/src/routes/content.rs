//! Announcement and CMS page handlers. Both are served from the content cache.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bazaar_core::{Announcement, CmsPage};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Active announcements, newest first.
#[instrument(skip(state))]
pub async fn announcements(State(state): State<AppState>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.cache().announcements(state.pool()).await?))
}

/// A CMS page by slug.
#[instrument(skip(state))]
pub async fn page(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<CmsPage>> {
    state
        .cache()
        .page(state.pool(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Page".to_owned()))
}
