use crate::enums::PoolKind;
use crate::error::DomainError;
use crate::math::{concentrated_liquidity, constant_product};
use crate::value_objects::{price::Price, price_range::PriceRange};
use rust_decimal::Decimal;

/// A liquidity position over a fixed price range, or over the whole price
/// axis when it sits in a constant-product pool.
///
/// Reserves are never stored: they follow from price, range and liquidity and
/// are recomputed through [`concentrated_liquidity::reserves_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityPosition {
    range: Option<PriceRange>,
    liquidity: Decimal,
    capital_value: Decimal,
}

impl LiquidityPosition {
    /// Creates a concentrated position with explicit liquidity.
    pub fn new(
        range: PriceRange,
        liquidity: Decimal,
        capital_value: Decimal,
    ) -> Result<Self, DomainError> {
        Self::build(Some(range), liquidity, capital_value)
    }

    /// Creates a full-range position with explicit liquidity.
    pub fn full_range(liquidity: Decimal, capital_value: Decimal) -> Result<Self, DomainError> {
        Self::build(None, liquidity, capital_value)
    }

    fn build(
        range: Option<PriceRange>,
        liquidity: Decimal,
        capital_value: Decimal,
    ) -> Result<Self, DomainError> {
        if liquidity <= Decimal::ZERO {
            return Err(DomainError::NonPositiveLiquidity(liquidity));
        }
        Ok(Self {
            range,
            liquidity,
            capital_value,
        })
    }

    /// Sizes liquidity so that the position is worth `capital_value` at `entry_price`.
    pub fn from_capital(
        range: PriceRange,
        capital_value: Decimal,
        entry_price: Price,
    ) -> Result<Self, DomainError> {
        let liquidity =
            concentrated_liquidity::liquidity_for_value(capital_value, entry_price, &range)?;
        Self::new(range, liquidity, capital_value)
    }

    /// Full-range counterpart of [`LiquidityPosition::from_capital`].
    pub fn full_range_from_capital(
        capital_value: Decimal,
        entry_price: Price,
    ) -> Result<Self, DomainError> {
        let liquidity = constant_product::liquidity_for_value(capital_value, entry_price)?;
        Self::full_range(liquidity, capital_value)
    }

    /// Deposits `base` and `quote` at `entry_price`; the scarcer side sets liquidity.
    ///
    /// `range` is `None` for a full-range position. Capital is the value of
    /// the whole deposit, including any excess the curve cannot absorb.
    pub fn from_reserves(
        range: Option<PriceRange>,
        base: Decimal,
        quote: Decimal,
        entry_price: Price,
    ) -> Result<Self, DomainError> {
        let liquidity = match &range {
            Some(range) => {
                concentrated_liquidity::liquidity_from_reserves(base, quote, entry_price, range)?
            }
            None => constant_product::liquidity_from_reserves(base, quote, entry_price)?,
        };
        Self::build(range, liquidity, base * entry_price.value() + quote)
    }

    /// The bounded range, `None` for a full-range position.
    #[must_use]
    pub fn range(&self) -> Option<&PriceRange> {
        self.range.as_ref()
    }

    #[must_use]
    pub fn pool_kind(&self) -> PoolKind {
        match self.range {
            Some(_) => PoolKind::Concentrated,
            None => PoolKind::ConstantProduct,
        }
    }

    #[must_use]
    pub fn liquidity(&self) -> Decimal {
        self.liquidity
    }

    #[must_use]
    pub fn capital_value(&self) -> Decimal {
        self.capital_value
    }

    /// Whether the position is active (earning fees) at `price`.
    #[must_use]
    pub fn is_in_range(&self, price: Price) -> bool {
        self.range.as_ref().is_none_or(|range| range.contains(price))
    }
}
