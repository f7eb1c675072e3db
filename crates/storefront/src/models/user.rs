//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, PaymentMethod, ShippingAddress, UserId, UserRole};

/// A storefront account. Guest checkouts create accounts without a password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    /// Last shipping address used at checkout.
    pub address: Option<ShippingAddress>,
    /// Last payment method chosen at checkout.
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
