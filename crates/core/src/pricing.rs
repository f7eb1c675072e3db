//! Cart and order totals.
//!
//! Both the cart (on every mutation) and checkout (inside the order
//! transaction) compute totals through [`Totals::compute`], so a persisted
//! total always equals its lines plus shipping plus tax.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, round2};

/// Shipping and tax rules applied to a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Charged on every non-empty cart below the free threshold.
    pub flat_shipping: Decimal,
    /// Carts at or above this items total ship free.
    pub free_shipping_threshold: Option<Decimal>,
    /// Fraction of the items total, e.g. `0.17`.
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            flat_shipping: Decimal::new(25000, 2),
            free_shipping_threshold: None,
            tax_rate: Decimal::ZERO,
        }
    }
}

impl PricingPolicy {
    /// Shipping for a cart whose lines total `items_price`.
    #[must_use]
    pub fn shipping_for(&self, items_price: Decimal, is_empty: bool) -> Decimal {
        let free = is_empty
            || self
                .free_shipping_threshold
                .is_some_and(|threshold| items_price >= threshold);
        round2(if free { Decimal::ZERO } else { self.flat_shipping })
    }
}

/// A priced line: a product snapshot and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub qty: i32,
    /// Unit price at the time the line was last written.
    pub price: Decimal,
}

impl PriceLine {
    /// `round2(price × qty)`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        round2(self.price * Decimal::from(self.qty))
    }
}

/// The four price fields carried by carts and orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

impl Default for Totals {
    fn default() -> Self {
        let zero = round2(Decimal::ZERO);
        Self {
            items_price: zero,
            shipping_price: zero,
            tax_price: zero,
            total_price: zero,
        }
    }
}

impl Totals {
    /// Compute totals for `lines` under `policy`.
    #[must_use]
    pub fn compute(lines: &[PriceLine], policy: &PricingPolicy) -> Self {
        let items_price = round2(lines.iter().map(PriceLine::subtotal).sum());
        let shipping_price = policy.shipping_for(items_price, lines.is_empty());
        let tax_price = round2(items_price * policy.tax_rate);

        Self {
            items_price,
            shipping_price,
            tax_price,
            total_price: round2(items_price + shipping_price + tax_price),
        }
    }
}

/// Fold `incoming` lines into `existing`.
///
/// Quantities for the same product are summed and the incoming snapshot
/// (name, image, price) replaces the existing one. Existing line order is
/// preserved; new products are appended in their incoming order.
#[must_use]
pub fn merge_lines(existing: Vec<PriceLine>, incoming: Vec<PriceLine>) -> Vec<PriceLine> {
    let mut merged = existing;
    for line in incoming {
        if let Some(current) = merged.iter_mut().find(|l| l.product_id == line.product_id) {
            let qty = current.qty.saturating_add(line.qty);
            *current = PriceLine { qty, ..line };
        } else {
            merged.push(line);
        }
    }
    merged
}

/// A product's selling price at `now`.
///
/// A positive discount applies while its end date is absent or in the future.
#[must_use]
pub fn effective_price(
    price: Decimal,
    discount_percentage: i32,
    discount_end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Decimal {
    let active = discount_percentage > 0 && discount_end_date.is_none_or(|end| end > now);
    if !active {
        return price;
    }
    let pct = Decimal::from(discount_percentage.min(100));
    round2(price * (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(product: ProductId, qty: i32, price: &str) -> PriceLine {
        PriceLine {
            product_id: product,
            name: "Khaddar Shawl".to_owned(),
            slug: "khaddar-shawl".to_owned(),
            image: "/images/shawl.jpg".to_owned(),
            qty,
            price: dec(price),
        }
    }

    #[test]
    fn test_empty_cart_has_zero_totals() {
        let totals = Totals::compute(&[], &PricingPolicy::default());
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_totals_serialize_with_two_decimals() {
        let policy = PricingPolicy {
            flat_shipping: dec("250"),
            ..PricingPolicy::default()
        };
        let totals = Totals::compute(&[line(ProductId::generate(), 2, "500")], &policy);
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["itemsPrice"], "1000.00");
        assert_eq!(json["shippingPrice"], "250.00");
        assert_eq!(json["taxPrice"], "0.00");
        assert_eq!(json["totalPrice"], "1250.00");

        let empty = serde_json::to_value(Totals::default()).unwrap();
        assert_eq!(empty["totalPrice"], "0.00");
    }

    #[test]
    fn test_flat_shipping_and_sum() {
        let lines = [
            line(ProductId::generate(), 2, "1499.99"),
            line(ProductId::generate(), 1, "300.00"),
        ];
        let totals = Totals::compute(&lines, &PricingPolicy::default());
        assert_eq!(totals.items_price, dec("3299.98"));
        assert_eq!(totals.shipping_price, dec("250.00"));
        assert_eq!(totals.tax_price, dec("0"));
        assert_eq!(totals.total_price, dec("3549.98"));
    }

    #[test]
    fn test_free_shipping_threshold_is_inclusive() {
        let policy = PricingPolicy {
            free_shipping_threshold: Some(dec("5000.00")),
            ..PricingPolicy::default()
        };
        let at = Totals::compute(&[line(ProductId::generate(), 2, "2500.00")], &policy);
        assert_eq!(at.shipping_price, Decimal::ZERO);
        let below = Totals::compute(&[line(ProductId::generate(), 1, "4999.99")], &policy);
        assert_eq!(below.shipping_price, dec("250.00"));
    }

    #[test]
    fn test_tax_is_rounded() {
        let policy = PricingPolicy {
            tax_rate: dec("0.17"),
            ..PricingPolicy::default()
        };
        let totals = Totals::compute(&[line(ProductId::generate(), 1, "99.99")], &policy);
        // 99.99 * 0.17 = 16.9983
        assert_eq!(totals.tax_price, dec("17.00"));
        assert_eq!(totals.total_price, dec("366.99"));
    }

    #[test]
    fn test_merge_sums_quantities_and_takes_incoming_snapshot() {
        let shared = ProductId::generate();
        let other = ProductId::generate();
        let existing = vec![line(shared, 2, "100.00")];
        let incoming = vec![line(other, 1, "50.00"), line(shared, 3, "90.00")];

        let merged = merge_lines(existing, incoming);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, shared);
        assert_eq!(merged[0].qty, 5);
        assert_eq!(merged[0].price, dec("90.00"));
        assert_eq!(merged[1].product_id, other);
    }

    #[test]
    fn test_effective_price_applies_live_discount() {
        let now = Utc::now();
        let price = dec("1000.00");
        assert_eq!(effective_price(price, 15, None, now), dec("850.00"));
        assert_eq!(
            effective_price(price, 15, Some(now + Duration::days(1)), now),
            dec("850.00")
        );
        assert_eq!(
            effective_price(price, 15, Some(now - Duration::days(1)), now),
            price
        );
        assert_eq!(effective_price(price, 0, None, now), price);
    }

    #[test]
    fn test_effective_price_rounds() {
        let now = Utc::now();
        // 333.33 * 0.67 = 223.3311
        assert_eq!(effective_price(dec("333.33"), 33, None, now), dec("223.33"));
    }
}
