//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts are kept at two decimal places. Rounding is midpoint away from
//! zero, which is how prices were quoted to customers historically.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a decimal amount to two places, midpoint away from zero.
///
/// The result always carries a scale of two, so `0` serializes as `"0.00"`.
#[must_use]
pub fn round2(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Errors that can occur when parsing a currency amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The input does not carry exactly two decimal places.
    #[error("price must have exactly two decimal places")]
    Precision,
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
}

/// Parse a currency string such as `"1499.00"`.
///
/// The string must have exactly two digits after the decimal point.
///
/// # Errors
///
/// Returns a [`PriceError`] if the input is malformed or negative.
pub fn parse_amount(s: &str) -> Result<Decimal, PriceError> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').ok_or(PriceError::Precision)?;
    if frac.len() != 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::Precision);
    }
    if whole.is_empty() {
        return Err(PriceError::NotANumber);
    }

    let amount: Decimal = s.parse().map_err(|_| PriceError::NotANumber)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PriceError::Negative);
    }
    Ok(amount)
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paisa).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price, rounded to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount: round2(amount),
            currency_code,
        }
    }

    /// A price in the store's default currency.
    #[must_use]
    pub fn pkr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::PKR)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    PKR,
    USD,
}

impl CurrencyCode {
    /// Symbol shown before an amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::PKR => "Rs",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round2_midpoint_away_from_zero() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("2.675")), dec("2.68"));
        assert_eq!(round2(dec("-1.005")), dec("-1.01"));
        assert_eq!(round2(dec("3.004")), dec("3.00"));
    }

    #[test]
    fn test_parse_amount_requires_two_decimals() {
        assert_eq!(parse_amount("1499.00").unwrap(), dec("1499.00"));
        assert_eq!(parse_amount("0.50").unwrap(), dec("0.50"));
        assert_eq!(parse_amount("12"), Err(PriceError::Precision));
        assert_eq!(parse_amount("12.5"), Err(PriceError::Precision));
        assert_eq!(parse_amount("12.505"), Err(PriceError::Precision));
        assert_eq!(parse_amount(".50"), Err(PriceError::NotANumber));
        assert_eq!(parse_amount("abc.de"), Err(PriceError::Precision));
    }

    #[test]
    fn test_parse_amount_rejects_negative() {
        assert_eq!(parse_amount("-5.00"), Err(PriceError::Negative));
    }

    #[test]
    fn test_display_uses_rupee_symbol() {
        assert_eq!(Price::pkr(dec("250")).to_string(), "Rs 250.00");
        assert_eq!(Price::pkr(dec("19.999")).to_string(), "Rs 20.00");
    }
}
