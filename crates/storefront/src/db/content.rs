//! Announcements and CMS pages.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{Announcement, AnnouncementId, CmsPage, CmsPageId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct AnnouncementRow {
    id: Uuid,
    text: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: AnnouncementId::new(row.id),
            text: row.text,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CmsPageRow {
    id: Uuid,
    slug: String,
    title: String,
    content: String,
    updated_at: DateTime<Utc>,
}

impl From<CmsPageRow> for CmsPage {
    fn from(row: CmsPageRow) -> Self {
        Self {
            id: CmsPageId::new(row.id),
            slug: row.slug,
            title: row.title,
            content: row.content,
            updated_at: row.updated_at,
        }
    }
}

/// Read-only access to storefront content.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active announcements, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_announcements(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(
            "SELECT id, text, is_active, created_at FROM announcements \
             WHERE is_active ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    /// A CMS page by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn page_by_slug(&self, slug: &str) -> Result<Option<CmsPage>, RepositoryError> {
        let row = sqlx::query_as::<_, CmsPageRow>(
            "SELECT id, slug, title, content, updated_at FROM cms_pages WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(CmsPage::from))
    }
}
