use crate::error::DomainError;
use crate::value_objects::price::Price;
use rust_decimal::Decimal;

/// A price interval `[lower, upper]` with `lower < upper`.
///
/// Square roots of both bounds are computed once at construction since every
/// reserve calculation needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRange {
    lower_price: Price,
    upper_price: Price,
    sqrt_lower: Decimal,
    sqrt_upper: Decimal,
}

impl PriceRange {
    /// Creates a range, rejecting `lower >= upper`.
    pub fn new(lower: Price, upper: Price) -> Result<Self, DomainError> {
        if lower >= upper {
            return Err(DomainError::InvalidRange {
                lower: lower.value(),
                upper: upper.value(),
            });
        }
        Ok(Self {
            lower_price: lower,
            upper_price: upper,
            sqrt_lower: lower.sqrt()?,
            sqrt_upper: upper.sqrt()?,
        })
    }

    /// Creates a range from raw decimal bounds.
    pub fn from_bounds(lower: Decimal, upper: Decimal) -> Result<Self, DomainError> {
        let lower_price = Price::new(lower).map_err(|_| DomainError::InvalidRange { lower, upper })?;
        let upper_price = Price::new(upper).map_err(|_| DomainError::InvalidRange { lower, upper })?;
        Self::new(lower_price, upper_price)
    }

    /// Lower bound.
    #[must_use]
    pub fn lower_price(&self) -> Price {
        self.lower_price
    }

    /// Upper bound.
    #[must_use]
    pub fn upper_price(&self) -> Price {
        self.upper_price
    }

    /// Square root of the lower bound.
    #[must_use]
    pub fn sqrt_lower(&self) -> Decimal {
        self.sqrt_lower
    }

    /// Square root of the upper bound.
    #[must_use]
    pub fn sqrt_upper(&self) -> Decimal {
        self.sqrt_upper
    }

    /// Whether the price lies inside the range, bounds included.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        price >= self.lower_price && price <= self.upper_price
    }

    /// The price clamped into the range.
    #[must_use]
    pub fn clamp(&self, price: Price) -> Price {
        price.clamp(self.lower_price, self.upper_price)
    }

    /// Geometric midpoint `sqrt(lower * upper)`.
    pub fn geometric_mid(&self) -> Result<Price, DomainError> {
        Price::new(self.sqrt_lower * self.sqrt_upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(v: Decimal) -> Price {
        Price::new(v).unwrap()
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = PriceRange::new(price(dec!(10)), price(dec!(9))).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidRange {
                lower: dec!(10),
                upper: dec!(9)
            }
        );
        assert!(PriceRange::new(price(dec!(10)), price(dec!(10))).is_err());
        assert!(PriceRange::from_bounds(dec!(-1), dec!(2)).is_err());
    }

    #[test]
    fn test_contains_and_clamp() {
        let range = PriceRange::from_bounds(dec!(90), dec!(110)).unwrap();
        assert!(range.contains(price(dec!(90))));
        assert!(range.contains(price(dec!(110))));
        assert!(!range.contains(price(dec!(89))));
        assert_eq!(range.clamp(price(dec!(120))).value(), dec!(110));
        assert_eq!(range.clamp(price(dec!(80))).value(), dec!(90));
        assert_eq!(range.clamp(price(dec!(95))).value(), dec!(95));
    }

    #[test]
    fn test_geometric_mid() {
        let range = PriceRange::from_bounds(dec!(4), dec!(16)).unwrap();
        let mid = range.geometric_mid().unwrap().value();
        assert!((mid - dec!(8)).abs() < dec!(0.0000000001));
    }
}
