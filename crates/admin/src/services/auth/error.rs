//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during admin sign-in.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Unknown e-mail, wrong password or malformed input.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Correct credentials for an account without the admin role.
    #[error("Admin access required")]
    NotAdmin,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
