//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// The environment variable is missing.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Resolve the database URL: `DATABASE_URL`, then the per-app variables.
pub fn database_url() -> Result<SecretString, MissingEnvVar> {
    ["DATABASE_URL", "STOREFRONT_DATABASE_URL", "ADMIN_DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .map(SecretString::from)
        .ok_or(MissingEnvVar("DATABASE_URL"))
}
