//! Authentication service.
//!
//! Password sign-up and sign-in for storefront customers. Accounts created by
//! guest checkout have no password; signing up with the same e-mail sets one
//! and takes over the account with its order history.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use bazaar_core::{Email, FieldErrors};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum display name length.
pub const MIN_NAME_LENGTH: usize = 3;

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// Validate every field, returning the parsed e-mail.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors when any field is invalid.
    pub fn validate(&self) -> Result<Email, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("name", self.name.trim(), MIN_NAME_LENGTH, "Name");
        let email = Email::parse(&self.email).map_err(|_| "Invalid email address");
        if let Err(message) = email {
            errors.add("email", message);
        }
        errors.min_len("password", &self.password, MIN_PASSWORD_LENGTH, "Password");
        if self.password != self.confirm_password {
            errors.add("confirmPassword", "Passwords don't match");
        }

        errors.into_result()?;
        email.map_err(|message| {
            let mut errors = FieldErrors::new();
            errors.add("email", message);
            errors
        })
    }
}

/// Sign-in form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
    /// Where to send the visitor afterwards.
    pub callback_url: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with a password, or set the password on an
    /// account created by guest checkout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for invalid fields and
    /// `AuthError::UserAlreadyExists` if the e-mail already has a password.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<User, AuthError> {
        let email = form.validate().map_err(AuthError::Validation)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create_with_password(form.name.trim(), &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Verify an e-mail and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for any mismatch, including
    /// malformed input, so callers cannot probe which part was wrong.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::InvalidCredentials);
        }

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm.to_owned(),
        }
    }

    #[test]
    fn test_sign_up_form_valid() {
        let email = form("Ayesha", "Ayesha@Example.com", "secret1", "secret1")
            .validate()
            .unwrap();
        assert_eq!(email.as_str(), "ayesha@example.com");
    }

    #[test]
    fn test_sign_up_form_collects_every_error() {
        let errors = form("Al", "nope", "123", "456").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters"));
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(errors.get("confirmPassword"), Some("Passwords don't match"));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
