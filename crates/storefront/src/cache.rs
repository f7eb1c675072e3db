//! In-process cache for rarely changing storefront content.
//!
//! Navigation categories, active announcements and CMS pages are cached for
//! 5 minutes using `moka`. Admin edits become visible once entries expire.

use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use bazaar_core::{Announcement, CategoryTree, CmsPage};

use crate::db::{CatalogRepository, ContentRepository, RepositoryError};

/// Cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    CategoryTree,
    Announcements,
    Page(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    CategoryTree(Vec<CategoryTree>),
    Announcements(Vec<Announcement>),
    /// `None` caches a missing page as well.
    Page(Option<Box<CmsPage>>),
}

/// Read-through cache over the catalog and content repositories.
#[derive(Clone)]
pub struct ContentCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Categories with their sub-categories, for navigation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading on a miss fails.
    pub async fn category_tree(&self, pool: &PgPool) -> Result<Vec<CategoryTree>, RepositoryError> {
        if let Some(CacheValue::CategoryTree(tree)) = self.cache.get(&CacheKey::CategoryTree).await {
            debug!("Cache hit for category tree");
            return Ok(tree);
        }

        let tree = CatalogRepository::new(pool).category_tree().await?;
        self.cache
            .insert(CacheKey::CategoryTree, CacheValue::CategoryTree(tree.clone()))
            .await;
        Ok(tree)
    }

    /// Active announcements, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading on a miss fails.
    pub async fn announcements(&self, pool: &PgPool) -> Result<Vec<Announcement>, RepositoryError> {
        if let Some(CacheValue::Announcements(list)) =
            self.cache.get(&CacheKey::Announcements).await
        {
            debug!("Cache hit for announcements");
            return Ok(list);
        }

        let list = ContentRepository::new(pool).active_announcements().await?;
        self.cache
            .insert(CacheKey::Announcements, CacheValue::Announcements(list.clone()))
            .await;
        Ok(list)
    }

    /// A CMS page by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading on a miss fails.
    pub async fn page(&self, pool: &PgPool, slug: &str) -> Result<Option<CmsPage>, RepositoryError> {
        let key = CacheKey::Page(slug.to_owned());
        if let Some(CacheValue::Page(page)) = self.cache.get(&key).await {
            debug!(slug, "Cache hit for page");
            return Ok(page.map(|p| *p));
        }

        let page = ContentRepository::new(pool).page_by_slug(slug).await?;
        self.cache
            .insert(key, CacheValue::Page(page.clone().map(Box::new)))
            .await;
        Ok(page)
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
