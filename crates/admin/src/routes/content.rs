//! Announcements and CMS pages.
//!
//! The storefront caches both for a few minutes, so edits appear there once
//! its cache entries expire.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bazaar_core::{Announcement, AnnouncementId, CmsPage};

use crate::db::{AnnouncementRepository, CmsPageRepository};
use crate::error::{Result, not_found};
use crate::extract;
use crate::middleware::RequireAdmin;
use crate::routes::Action;
use crate::services::content::{AnnouncementForm, PageForm};
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn list_announcements(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Announcement>>> {
    let announcements = AnnouncementRepository::new(state.pool()).list().await?;
    Ok(Json(announcements))
}

#[instrument(skip(state, _admin, form))]
pub async fn create_announcement(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Json(form): extract::Json<AnnouncementForm>,
) -> Result<Json<Action<Announcement>>> {
    let text = form.validate()?;
    let announcement = AnnouncementRepository::new(state.pool())
        .create(text)
        .await?;
    Ok(Json(
        Action::ok("Announcement created successfully").with_data(announcement),
    ))
}

#[instrument(skip(state, _admin, form))]
pub async fn update_announcement(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AnnouncementId>,
    extract::Json(form): extract::Json<AnnouncementForm>,
) -> Result<Json<Action<Announcement>>> {
    let text = form.validate()?;
    let announcement = AnnouncementRepository::new(state.pool())
        .update_text(id, text)
        .await
        .map_err(not_found("Announcement"))?;
    Ok(Json(
        Action::ok("Announcement updated successfully").with_data(announcement),
    ))
}

#[instrument(skip(state, _admin))]
pub async fn toggle_announcement(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<Action<Announcement>>> {
    let announcement = AnnouncementRepository::new(state.pool())
        .toggle(id)
        .await
        .map_err(not_found("Announcement"))?;

    let message = if announcement.is_active {
        "Announcement activated"
    } else {
        "Announcement deactivated"
    };
    Ok(Json(Action::ok(message).with_data(announcement)))
}

#[instrument(skip(state, _admin))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<Action>> {
    AnnouncementRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("Announcement"))?;
    Ok(Json(Action::ok("Announcement deleted successfully")))
}

#[instrument(skip(state, _admin))]
pub async fn list_pages(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<CmsPage>>> {
    let pages = CmsPageRepository::new(state.pool()).list().await?;
    Ok(Json(pages))
}

#[instrument(skip(state, _admin))]
pub async fn show_page(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(slug): Path<String>,
) -> Result<Json<CmsPage>> {
    let page = CmsPageRepository::new(state.pool())
        .get(&slug)
        .await
        .map_err(not_found("Page"))?;
    Ok(Json(page))
}

/// Update a page; the content is sanitized before it is stored.
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn update_page(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(slug): Path<String>,
    extract::Json(form): extract::Json<PageForm>,
) -> Result<Json<Action<CmsPage>>> {
    let clean = form.validate()?;
    let page = CmsPageRepository::new(state.pool())
        .update(&slug, &clean.title, &clean.content)
        .await
        .map_err(not_found("Page"))?;

    tracing::info!(slug = %slug, "Page updated");
    Ok(Json(Action::ok("Page updated successfully").with_data(page)))
}
