//! Cart ownership resolution.
//!
//! A signed-in visitor's cart is keyed by user id. An anonymous visitor's cart
//! is keyed by a random token stored in the session; the token is assigned on
//! the first add-to-cart, so browsing never creates a cart.

use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{CartOwner, CurrentUser, session_keys};

pub use crate::db::carts::CartError;

/// The visitor's cart owner, if they can have a cart yet.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn resolve_owner(
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Option<CartOwner>, tower_sessions::session::Error> {
    if let Some(user) = user {
        return Ok(Some(CartOwner::User(user.id)));
    }
    Ok(anonymous_token(session).await?.map(CartOwner::Session))
}

/// The anonymous cart token, left in place.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn anonymous_token(
    session: &Session,
) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.get::<Uuid>(session_keys::CART_TOKEN).await
}

/// The visitor's cart owner, assigning an anonymous token if needed.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn ensure_owner(
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<CartOwner, tower_sessions::session::Error> {
    if let Some(owner) = resolve_owner(session, user).await? {
        return Ok(owner);
    }
    let token = Uuid::new_v4();
    session.insert(session_keys::CART_TOKEN, token).await?;
    Ok(CartOwner::Session(token))
}

/// Remove and return the anonymous cart token.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn take_token(session: &Session) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.remove::<Uuid>(session_keys::CART_TOKEN).await
}
