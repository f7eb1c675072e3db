//! Authentication error types.

use thiserror::Error;

use bazaar_core::FieldErrors;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// One or more sign-up or sign-in fields failed validation.
    #[error("invalid input")]
    Validation(FieldErrors),

    /// Wrong password, unknown e-mail, or an account without a password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// User already exists.
    #[error("User already exists")]
    UserAlreadyExists,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
