//! Requested quantity type.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places stored for a quantity.
pub const QUANTITY_SCALE: u32 = 3;

/// Largest quantity the inventory store can hold: `99_999_999_999.999`.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 3);

/// Errors that can occur when constructing a [`RequestedQuantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The quantity is zero or negative.
    #[error("quantity must be greater than zero, got {0}")]
    NotPositive(Decimal),
    /// The quantity has more decimal places than stock is counted in.
    #[error("quantity {0} has more than 3 decimal places")]
    TooPrecise(Decimal),
    /// The quantity exceeds [`MAX_QUANTITY`].
    #[error("quantity exceeds 99999999999.999")]
    TooLarge,
    /// The input is not a decimal number.
    #[error("invalid quantity: {0}")]
    Invalid(String),
}

/// A strictly positive quantity of an item to draw from stock.
///
/// Zero and negative requests are rejected at construction, so every
/// allocation is asked for a real amount. Values are also limited to what a
/// stock batch can record: at most [`QUANTITY_SCALE`] decimal places and no
/// more than [`MAX_QUANTITY`].
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use service_bay_core::RequestedQuantity;
///
/// assert!(RequestedQuantity::new(Decimal::from(3)).is_ok());
/// assert!(RequestedQuantity::new(Decimal::ZERO).is_err());
/// assert!("2.5".parse::<RequestedQuantity>().is_ok());
/// assert!("-1".parse::<RequestedQuantity>().is_err());
/// assert!("0.0005".parse::<RequestedQuantity>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct RequestedQuantity(Decimal);

impl RequestedQuantity {
    /// Create a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` if `value <= 0`.
    /// Returns `QuantityError::TooPrecise` if `value` has more than
    /// [`QUANTITY_SCALE`] significant decimal places.
    /// Returns `QuantityError::TooLarge` if `value` exceeds [`MAX_QUANTITY`].
    pub fn new(value: Decimal) -> Result<Self, QuantityError> {
        if value <= Decimal::ZERO {
            return Err(QuantityError::NotPositive(value));
        }
        if value.normalize().scale() > QUANTITY_SCALE {
            return Err(QuantityError::TooPrecise(value));
        }
        if value > MAX_QUANTITY {
            return Err(QuantityError::TooLarge);
        }
        Ok(Self(value))
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn get(&self) -> Decimal {
        self.0
    }

    /// Sum of two requests for the same item.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` if the sum exceeds [`MAX_QUANTITY`].
    pub fn combine(self, other: Self) -> Result<Self, QuantityError> {
        let sum = self.0.checked_add(other.0).ok_or(QuantityError::TooLarge)?;
        Self::new(sum)
    }
}

impl TryFrom<Decimal> for RequestedQuantity {
    type Error = QuantityError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for RequestedQuantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(Decimal::from(value))
    }
}

impl From<RequestedQuantity> for Decimal {
    fn from(quantity: RequestedQuantity) -> Self {
        quantity.0
    }
}

impl FromStr for RequestedQuantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| QuantityError::Invalid(s.to_owned()))?;
        Self::new(value)
    }
}

impl fmt::Display for RequestedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(
            RequestedQuantity::new(Decimal::ZERO),
            Err(QuantityError::NotPositive(Decimal::ZERO))
        );
        assert!(matches!(
            RequestedQuantity::new(dec!(-2)),
            Err(QuantityError::NotPositive(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("4".parse::<RequestedQuantity>().unwrap().get(), dec!(4));
        assert_eq!(" 0.25 ".parse::<RequestedQuantity>().unwrap().get(), dec!(0.25));
        assert!(matches!(
            "four".parse::<RequestedQuantity>(),
            Err(QuantityError::Invalid(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: RequestedQuantity = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(parsed.get(), dec!(3));

        assert!(serde_json::from_str::<RequestedQuantity>("\"0\"").is_err());
    }

    #[test]
    fn test_combine() {
        let a = RequestedQuantity::try_from(2).unwrap();
        let b = RequestedQuantity::new(dec!(1.5)).unwrap();
        assert_eq!(a.combine(b).unwrap().get(), dec!(3.5));
    }

    #[test]
    fn test_combine_past_max() {
        let big = RequestedQuantity::new(MAX_QUANTITY).unwrap();
        let one = RequestedQuantity::try_from(1).unwrap();
        assert_eq!(big.combine(one), Err(QuantityError::TooLarge));
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert_eq!(
            RequestedQuantity::new(dec!(0.0006)),
            Err(QuantityError::TooPrecise(dec!(0.0006)))
        );
        assert!(RequestedQuantity::new(dec!(0.001)).is_ok());
        // Trailing zeros carry no precision.
        assert!(RequestedQuantity::new(dec!(1.25000)).is_ok());
    }

    #[test]
    fn test_rejects_beyond_max() {
        assert!(RequestedQuantity::new(MAX_QUANTITY).is_ok());
        assert_eq!(
            RequestedQuantity::new(Decimal::MAX),
            Err(QuantityError::TooLarge)
        );
        assert_eq!(MAX_QUANTITY, dec!(99999999999.999));
    }

    #[test]
    fn test_display_normalizes() {
        let q = RequestedQuantity::new(dec!(2.500)).unwrap();
        assert_eq!(q.to_string(), "2.5");
    }
}
