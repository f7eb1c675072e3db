//! Database migration command.
//!
//! Applies `migrations/` and creates the `storefront_session` and
//! `admin_session` tables used by the two apps' session stores.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `STOREFRONT_DATABASE_URL`, then `ADMIN_DATABASE_URL`)

use thiserror::Error;

use bazaar_admin::db;

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    SessionStore(String),
}

/// Run all migrations, then create the session tables.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Creating session tables...");
    bazaar_storefront::middleware::session_store(&pool)
        .map_err(MigrationError::SessionStore)?
        .migrate()
        .await?;
    bazaar_admin::middleware::session_store(&pool)
        .map_err(MigrationError::SessionStore)?
        .migrate()
        .await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
