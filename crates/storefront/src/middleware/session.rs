//! Session middleware configuration.
//!
//! Sessions are stored in `PostgreSQL` (table `tower_sessions.storefront_session`)
//! using tower-sessions. The table is created by `bazaar migrate`.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session table name.
pub const SESSION_TABLE_NAME: &str = "storefront_session";

/// Default inactivity expiry in seconds (7 days).
pub const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Inactivity expiry for "remember me" sign-ins, in seconds (30 days).
pub const REMEMBER_ME_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Build the `PostgreSQL` session store.
///
/// # Errors
///
/// Returns the store's validation message if the table name is rejected.
pub fn session_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone()).with_table_name(SESSION_TABLE_NAME)
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(
    store: PostgresStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Session expiry after a sign-in.
///
/// "Remember me" keeps the session alive for 30 days of inactivity; otherwise
/// the cookie lasts until the browser closes.
#[must_use]
pub const fn sign_in_expiry(remember_me: bool) -> Expiry {
    if remember_me {
        Expiry::OnInactivity(tower_sessions::cookie::time::Duration::seconds(
            REMEMBER_ME_EXPIRY_SECONDS,
        ))
    } else {
        Expiry::OnSessionEnd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_me_keeps_session_for_thirty_days() {
        match sign_in_expiry(true) {
            Expiry::OnInactivity(duration) => {
                assert_eq!(duration.whole_days(), 30);
                assert_eq!(duration.whole_seconds(), REMEMBER_ME_EXPIRY_SECONDS);
            }
            other => panic!("expected inactivity expiry, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_sign_in_ends_with_browser() {
        assert!(matches!(sign_in_expiry(false), Expiry::OnSessionEnd));
    }
}
