//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//! ```
//!
//! An existing account with the same e-mail is promoted to admin and its
//! password replaced.

use bazaar_admin::services::auth::hash_password;
use bazaar_core::{Email, UserId, UserRole};
use bazaar_storefront::services::auth::MIN_PASSWORD_LENGTH;
use sqlx::PgPool;
use thiserror::Error;

use super::{MissingEnvVar, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name must be at least 3 characters")]
    InvalidName,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("Failed to hash password")]
    PasswordHash,
}

/// Create or promote an admin user.
///
/// # Returns
///
/// The ID of the admin user.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let name = name.trim();
    if name.chars().count() < 3 {
        return Err(AdminError::InvalidName);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }
    let password_hash = hash_password(password).map_err(|_| AdminError::PasswordHash)?;

    tracing::info!("Connecting to database...");
    let pool = bazaar_admin::db::create_pool(&database_url()?).await?;

    let user_id = upsert_admin(&pool, &email, name, &password_hash).await?;

    tracing::info!(
        "Admin user ready! ID: {}, Email: {}, Role: {}",
        user_id,
        email,
        UserRole::Admin
    );
    Ok(user_id)
}

async fn upsert_admin(
    pool: &PgPool,
    email: &Email,
    name: &str,
    password_hash: &str,
) -> Result<UserId, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let user_id: UserId = sqlx::query_scalar(
        r"
        INSERT INTO users (name, email, role)
        VALUES ($1, $2, 'admin')
        ON CONFLICT ((LOWER(email)))
        DO UPDATE SET name = EXCLUDED.name, role = 'admin', updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(name)
    .bind(email.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r"
        INSERT INTO user_passwords (user_id, password_hash)
        VALUES ($1, $2)
        ON CONFLICT (user_id)
        DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
        ",
    )
    .bind(user_id)
    .bind(password_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(user_id)
}
