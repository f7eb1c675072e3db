//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! plain records shared by the storefront and the back-office.

pub mod address;
pub mod catalog;
pub mod content;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use address::ShippingAddress;
pub use catalog::{Category, CategoryTree, Product, SubCategory};
pub use content::{ANNOUNCEMENT_MIN_LEN, Announcement, CmsPage};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderLine};
pub use price::{CurrencyCode, Price, PriceError, parse_amount, round2};
pub use status::*;
