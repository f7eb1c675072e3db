//! Account administration and admin sign-in lookups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{Email, PageRequest, Paginated, UserId, UserRole};

use super::{RepositoryError, contains_pattern};
use crate::models::AdminUser;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: UserRole,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, name, email, role, created_at";

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Users newest first, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is corrupt.
    pub async fn list(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<AdminUser>, RepositoryError> {
        let pattern = query.map(contains_pattern);

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE $1::text IS NULL OR name ILIKE $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE $1::text IS NULL OR name ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(AdminUser::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(users, count, page))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has `id`.
    pub async fn get(&self, id: UserId) -> Result<AdminUser, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    /// Set a user's name and role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has `id`.
    pub async fn update(
        &self,
        id: UserId,
        name: &str,
        role: UserRole,
    ) -> Result<AdminUser, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2, role = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(name)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Delete a user. Their cart and orders go with them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has `id`.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// A password-holding user and their hash, for sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(
            r"
            SELECT u.id, u.name, u.email, u.role, u.created_at, p.password_hash
            FROM users u
            JOIN user_passwords p ON p.user_id = u.id
            WHERE LOWER(u.email) = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((AdminUser::try_from(r.user)?, r.password_hash)))
            .transpose()
    }
}
