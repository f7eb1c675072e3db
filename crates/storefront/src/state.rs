//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use bazaar_core::PricingPolicy;

use crate::cache::ContentCache;
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    pricing: PricingPolicy,
    cache: ContentCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let pricing = config.pricing.policy();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                pricing,
                cache: ContentCache::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Shipping and tax rules for carts and orders.
    #[must_use]
    pub fn pricing(&self) -> PricingPolicy {
        self.inner.pricing
    }

    /// Cached navigation and content.
    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.inner.cache
    }
}
