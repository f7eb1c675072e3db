//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password sign-in restricted to the admin role
//! - `catalog` - Product and category form validation
//! - `content` - Announcement validation and page sanitizing
//! - `email` - Purchase receipts via SMTP

pub mod auth;
pub mod catalog;
pub mod content;
pub mod email;

pub use auth::{AdminAuthError, AdminAuthService};
pub use email::{EmailService, MailError};
