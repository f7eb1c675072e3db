//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used by every Bazaar component:
//! - `storefront` - Public catalog, cart, checkout and order API
//! - `admin` - Back-office API for catalog, content and fulfillment
//! - `cli` - Migrations, seeding and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Cart totals, checkout validation and pagination math live
//! here so both binaries compute them identically.
//!
//! # Modules
//!
//! - [`types`] - Ids, e-mail, money, statuses, addresses and domain records
//! - [`pricing`] - Cart and order totals
//! - [`validation`] - Field-level validation errors
//! - [`pagination`] - Page requests and paginated results

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod pricing;
pub mod types;
pub mod validation;

pub use pagination::{PageRequest, Paginated};
pub use pricing::{PriceLine, PricingPolicy, Totals, effective_price, merge_lines};
pub use types::*;
pub use validation::FieldErrors;
