//! Non-negative catalog prices using decimal arithmetic.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount has fractions of a cent.
    #[error("price can have at most {} decimal places", Price::MAX_SCALE)]
    TooPrecise,
}

/// A shop item price in the store currency (dollars, not cents).
///
/// Prices are never negative; deserialization rejects negative amounts so a
/// malformed gateway row cannot produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Decimal places the `price` column keeps.
    pub const MAX_SCALE: u32 = 2;

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero, or
    /// [`PriceError::TooPrecise`] if it has fractions of a cent. Trailing
    /// zeros do not count.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for form inputs (`"19.99"`, no currency symbol).
    #[must_use]
    pub fn to_input_value(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl fmt::Display for Price {
    /// Formats as `$19.99`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(1999).to_string(), "$19.99");
        assert_eq!("5".parse::<Price>().unwrap().to_string(), "$5.00");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!("-0.01".parse::<Price>(), Err(PriceError::Negative));
        assert_eq!("abc".parse::<Price>(), Err(PriceError::NotANumber));
        assert!("0".parse::<Price>().is_ok());
    }

    #[test]
    fn test_rejects_fractions_of_a_cent() {
        assert_eq!("1.999".parse::<Price>(), Err(PriceError::TooPrecise));
        assert_eq!("0.001".parse::<Price>(), Err(PriceError::TooPrecise));
        assert!(serde_json::from_str::<Price>("19.995").is_err());

        assert_eq!(
            "10.500".parse::<Price>().unwrap(),
            Price::from_cents(1050)
        );
        assert!("249.50".parse::<Price>().is_ok());
    }

    #[test]
    fn test_input_value_drops_trailing_zeros() {
        assert_eq!("12.50".parse::<Price>().unwrap().to_input_value(), "12.5");
        assert_eq!("3".parse::<Price>().unwrap().to_input_value(), "3");
    }

    #[test]
    fn test_deserializes_gateway_numbers() {
        let price: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(price, Price::from_cents(1999));

        let price: Price = serde_json::from_str("\"4.5\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(45, 1));

        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
