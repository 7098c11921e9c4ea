use crate::error::DomainError;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive price, quoted as quote currency per unit of base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price {
    value: Decimal,
}

impl Price {
    /// Creates a price, rejecting zero and negative values.
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::NonPositivePrice(value));
        }
        Ok(Self { value })
    }

    /// Returns the raw decimal value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Square root of the price.
    pub fn sqrt(&self) -> Result<Decimal, DomainError> {
        self.value
            .sqrt()
            .ok_or(DomainError::Arithmetic("square root of price"))
    }

    /// Absolute log-return from `previous` to `self`.
    pub fn abs_log_return(&self, previous: Price) -> Result<Decimal, DomainError> {
        let ratio = self
            .value
            .checked_div(previous.value)
            .ok_or(DomainError::Arithmetic("price ratio overflow"))?;
        ratio
            .checked_ln()
            .map(|r| r.abs())
            .ok_or(DomainError::Arithmetic("log of price ratio"))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.value
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(
            Price::new(dec!(0)),
            Err(DomainError::NonPositivePrice(dec!(0)))
        );
        assert!(Price::new(dec!(-3.5)).is_err());
        assert!(Price::new(dec!(0.0001)).is_ok());
    }

    #[test]
    fn test_abs_log_return_is_symmetric() {
        let a = Price::new(dec!(10)).unwrap();
        let b = Price::new(dec!(11)).unwrap();
        let up = b.abs_log_return(a).unwrap();
        let down = a.abs_log_return(b).unwrap();
        assert!(up > Decimal::ZERO);
        assert!((up - down).abs() < dec!(0.0000000001));
        // ln(1.1) ~= 0.0953102
        assert!((up - dec!(0.0953102)).abs() < dec!(0.000001));
    }
}
