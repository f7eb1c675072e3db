//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password sign-up and sign-in
//! - `cart` - Cart ownership (user id or anonymous session token)
//! - `checkout` - Place-order payload validation

pub mod auth;
pub mod cart;
pub mod checkout;
