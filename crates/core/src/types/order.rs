//! Order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::ShippingAddress;
use super::id::{OrderId, ProductId, UserId};
use super::status::PaymentMethod;
use crate::pricing::{PriceLine, Totals};

/// A frozen cart line, numbered from 1 within its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub line_no: i32,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub qty: i32,
    pub price: Decimal,
}

impl OrderLine {
    /// Number `lines` from 1 in their given order.
    #[must_use]
    pub fn number(lines: &[PriceLine]) -> Vec<Self> {
        lines
            .iter()
            .zip(1..)
            .map(|(line, line_no)| Self {
                line_no,
                product_id: line.product_id,
                name: line.name.clone(),
                slug: line.slug.clone(),
                image: line.image.clone(),
                qty: line.qty,
                price: line.price,
            })
            .collect()
    }
}

/// A placed order.
///
/// Only the fulfillment flags change after placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub totals: Totals,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_starts_at_one() {
        let line = |name: &str| PriceLine {
            product_id: ProductId::generate(),
            name: name.to_owned(),
            slug: name.to_lowercase(),
            image: String::new(),
            qty: 1,
            price: Decimal::ONE,
        };
        let numbered = OrderLine::number(&[line("Ajrak"), line("Kurta")]);
        assert_eq!(numbered[0].line_no, 1);
        assert_eq!(numbered[1].line_no, 2);
        assert_eq!(numbered[1].name, "Kurta");
    }
}
