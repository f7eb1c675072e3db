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

const ANNOUNCEMENT_COLUMNS: &str = "id, text, is_active, created_at";

pub struct AnnouncementRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnnouncementRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All announcements, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    /// Insert an active announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, text: &str) -> Result<Announcement, RepositoryError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "INSERT INTO announcements (text) VALUES ($1) RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(text)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no announcement has `id`.
    pub async fn update_text(
        &self,
        id: AnnouncementId,
        text: &str,
    ) -> Result<Announcement, RepositoryError> {
        sqlx::query_as::<_, AnnouncementRow>(&format!(
            "UPDATE announcements SET text = $2 WHERE id = $1 RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(text)
        .fetch_optional(self.pool)
        .await?
        .map(Announcement::from)
        .ok_or(RepositoryError::NotFound)
    }

    /// Flip `is_active` and return the new state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no announcement has `id`.
    pub async fn toggle(&self, id: AnnouncementId) -> Result<Announcement, RepositoryError> {
        sqlx::query_as::<_, AnnouncementRow>(&format!(
            "UPDATE announcements SET is_active = NOT is_active WHERE id = $1 \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?
        .map(Announcement::from)
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no announcement has `id`.
    pub async fn delete(&self, id: AnnouncementId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

const PAGE_COLUMNS: &str = "id, slug, title, content, updated_at";

pub struct CmsPageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CmsPageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CmsPage>, RepositoryError> {
        let rows = sqlx::query_as::<_, CmsPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM cms_pages ORDER BY slug"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CmsPage::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no page has `slug`.
    pub async fn get(&self, slug: &str) -> Result<CmsPage, RepositoryError> {
        sqlx::query_as::<_, CmsPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM cms_pages WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        .map(CmsPage::from)
        .ok_or(RepositoryError::NotFound)
    }

    /// Replace a page's title and (already sanitized) content.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no page has `slug`.
    pub async fn update(
        &self,
        slug: &str,
        title: &str,
        content: &str,
    ) -> Result<CmsPage, RepositoryError> {
        sqlx::query_as::<_, CmsPageRow>(&format!(
            "UPDATE cms_pages SET title = $2, content = $3, updated_at = NOW() \
             WHERE slug = $1 RETURNING {PAGE_COLUMNS}"
        ))
        .bind(slug)
        .bind(title)
        .bind(content)
        .fetch_optional(self.pool)
        .await?
        .map(CmsPage::from)
        .ok_or(RepositoryError::NotFound)
    }
}
