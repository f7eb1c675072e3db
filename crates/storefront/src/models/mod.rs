//! Domain models for the storefront.

pub mod cart;
pub mod session;
pub mod user;

pub use cart::{Cart, CartOwner};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
