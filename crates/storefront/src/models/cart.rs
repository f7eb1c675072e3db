//! Cart types.

use serde::Serialize;
use uuid::Uuid;

use bazaar_core::{CartId, PriceLine, Totals, UserId};

/// Who a cart belongs to.
///
/// Signed-in visitors always resolve by user id; anonymous visitors by the
/// token held in their session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    User(UserId),
    Session(Uuid),
}

/// A cart with its lines and stored totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub items: Vec<PriceLine>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|line| i64::from(line.qty)).sum()
    }
}
