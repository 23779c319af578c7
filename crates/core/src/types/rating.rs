//! User ratings on a 0-5 scale.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside 0..=5.
    #[error("rating must be between 0 and 5")]
    OutOfRange,
    /// The value has more than one decimal place.
    #[error("rating can have at most {} decimal place", Rating::MAX_SCALE)]
    TooPrecise,
    /// The input is not a decimal number.
    #[error("rating must be a number")]
    NotANumber,
}

/// An average user rating between 0 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rating(Decimal);

impl Rating {
    /// Highest possible rating.
    pub const MAX: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

    /// Decimal places the `user_rating` column keeps.
    pub const MAX_SCALE: u32 = 1;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] unless `0 <= value <= 5`, or
    /// [`RatingError::TooPrecise`] past one decimal place.
    pub fn new(value: Decimal) -> Result<Self, RatingError> {
        if value < Decimal::ZERO || value > Self::MAX {
            return Err(RatingError::OutOfRange);
        }
        if value.normalize().scale() > Self::MAX_SCALE {
            return Err(RatingError::TooPrecise);
        }
        Ok(Self(value))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Format for form inputs (`"4.5"`).
    #[must_use]
    pub fn to_input_value(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl fmt::Display for Rating {
    /// Formats with one decimal place, e.g. `4.0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0.round_dp(1))
    }
}

impl FromStr for Rating {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| RatingError::NotANumber)?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Rating {
    type Error = RatingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for Decimal {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!("0".parse::<Rating>().is_ok());
        assert!("5".parse::<Rating>().is_ok());
        assert_eq!("5.1".parse::<Rating>(), Err(RatingError::OutOfRange));
        assert_eq!("-1".parse::<Rating>(), Err(RatingError::OutOfRange));
        assert_eq!("great".parse::<Rating>(), Err(RatingError::NotANumber));
    }

    #[test]
    fn test_display_one_decimal() {
        assert_eq!("4".parse::<Rating>().unwrap().to_string(), "4.0");
        assert_eq!("3.50".parse::<Rating>().unwrap().to_string(), "3.5");
    }

    #[test]
    fn test_rejects_second_decimal_place() {
        assert_eq!("4.25".parse::<Rating>(), Err(RatingError::TooPrecise));
        assert!(serde_json::from_str::<Rating>("3.75").is_err());
        assert_eq!("4.50".parse::<Rating>().unwrap().to_input_value(), "4.5");
    }
}
