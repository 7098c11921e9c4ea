use crate::entities::position::LiquidityPosition;
use crate::error::DomainError;
use crate::math::constant_product;
use crate::value_objects::{price::Price, price_range::PriceRange};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orders a pair of sqrt prices as `(lower, upper)`.
fn ordered(sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> (Decimal, Decimal) {
    if sqrt_price_a < sqrt_price_b {
        (sqrt_price_a, sqrt_price_b)
    } else {
        (sqrt_price_b, sqrt_price_a)
    }
}

/// Amount of base (x) spanned by liquidity between two sqrt prices.
/// delta_x = L * (1/sqrt(P_a) - 1/sqrt(P_b))
pub fn get_amount0_delta(
    liquidity: Decimal,
    sqrt_price_a: Decimal,
    sqrt_price_b: Decimal,
) -> Result<Decimal, DomainError> {
    if sqrt_price_a <= Decimal::ZERO || sqrt_price_b <= Decimal::ZERO {
        return Err(DomainError::Arithmetic("sqrt price must be positive"));
    }
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b);

    // delta_x = L * ( (upper - lower) / (lower * upper) )
    let factor = (upper - lower)
        .checked_div(lower * upper)
        .ok_or(DomainError::Arithmetic("amount0 delta overflow"))?;
    Ok(liquidity * factor)
}

/// Amount of quote (y) spanned by liquidity between two sqrt prices.
/// delta_y = L * (sqrt(P_b) - sqrt(P_a))
#[must_use]
pub fn get_amount1_delta(liquidity: Decimal, sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Decimal {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b);
    liquidity * (upper - lower)
}

/// Liquidity backed by `amount0` of base over a sqrt price interval.
/// L = amount0 * (sqrt(P_a) * sqrt(P_b)) / (sqrt(P_b) - sqrt(P_a))
pub fn get_liquidity_for_amount0(
    amount0: Decimal,
    sqrt_price_a: Decimal,
    sqrt_price_b: Decimal,
) -> Result<Decimal, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b);
    (amount0 * lower * upper)
        .checked_div(upper - lower)
        .ok_or(DomainError::Arithmetic("empty sqrt price interval"))
}

/// Liquidity backed by `amount1` of quote over a sqrt price interval.
/// L = amount1 / (sqrt(P_b) - sqrt(P_a))
pub fn get_liquidity_for_amount1(
    amount1: Decimal,
    sqrt_price_a: Decimal,
    sqrt_price_b: Decimal,
) -> Result<Decimal, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b);
    amount1
        .checked_div(upper - lower)
        .ok_or(DomainError::Arithmetic("empty sqrt price interval"))
}

/// Base and quote held by a position at some price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reserves {
    /// Base asset quantity (x).
    pub base: Decimal,
    /// Quote asset quantity (y).
    pub quote: Decimal,
}

impl Reserves {
    /// Quote-currency value of these reserves at `price`.
    #[must_use]
    pub fn value_at(&self, price: Price) -> Decimal {
        self.base * price.value() + self.quote
    }
}

/// Reserve split of `liquidity` over `range` at `price`.
fn range_reserves(
    price: Price,
    range: &PriceRange,
    liquidity: Decimal,
) -> Result<Reserves, DomainError> {
    let sqrt_lower = range.sqrt_lower();
    let sqrt_upper = range.sqrt_upper();

    if price <= range.lower_price() {
        // Below range: all base, enough to cross [lower, upper].
        Ok(Reserves {
            base: get_amount0_delta(liquidity, sqrt_lower, sqrt_upper)?,
            quote: Decimal::ZERO,
        })
    } else if price >= range.upper_price() {
        Ok(Reserves {
            base: Decimal::ZERO,
            quote: get_amount1_delta(liquidity, sqrt_lower, sqrt_upper),
        })
    } else {
        let sqrt_price = price.sqrt()?;
        Ok(Reserves {
            base: get_amount0_delta(liquidity, sqrt_price, sqrt_upper)?,
            quote: get_amount1_delta(liquidity, sqrt_lower, sqrt_price),
        })
    }
}

/// Reserve composition of `position` at `price`.
///
/// Below the range the position is all base, above it all quote; one reserve
/// reaches zero exactly at each boundary so value is continuous there. A
/// full-range position follows the constant-product curve.
pub fn reserves_at(price: Price, position: &LiquidityPosition) -> Result<Reserves, DomainError> {
    match position.range() {
        Some(range) => range_reserves(price, range, position.liquidity()),
        None => constant_product::reserves_at(price, position.liquidity()),
    }
}

/// Quote-currency value of `position` at `price`.
pub fn value_at(price: Price, position: &LiquidityPosition) -> Result<Decimal, DomainError> {
    Ok(reserves_at(price, position)?.value_at(price))
}

/// The price at which the position's curve currently sits: `price` clamped to the range.
#[must_use]
pub fn marginal_price(price: Price, position: &LiquidityPosition) -> Price {
    position.range().map_or(price, |range| range.clamp(price))
}

/// Which side the arbitrageur pays in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwapDirection {
    /// Price rises: quote in, base out.
    QuoteForBase,
    /// Price falls: base in, quote out.
    BaseForQuote,
}

/// The arbitrage trade that moves a position between two prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SwapQuote {
    /// Amount paid into the position.
    pub amount_in: Decimal,
    /// Amount taken out of the position.
    pub amount_out: Decimal,
    /// Quote leg of the trade.
    pub notional: Decimal,
    /// `None` when nothing traded.
    pub direction: Option<SwapDirection>,
}

impl SwapQuote {
    /// Whether the swap moved no tokens.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.direction.is_none()
    }
}

/// Trade moving the position's marginal price from `price_from` to `price_to`.
///
/// Only the portion of the move inside the range trades; a move entirely
/// outside the range, or between equal prices, is a zero trade.
pub fn swap_to_price(
    price_from: Price,
    price_to: Price,
    position: &LiquidityPosition,
) -> Result<SwapQuote, DomainError> {
    if position.range().is_none() {
        return constant_product::swap_to_price(price_from, price_to, position.liquidity());
    }
    let from = marginal_price(price_from, position);
    let to = marginal_price(price_to, position);
    if from == to {
        return Ok(SwapQuote::default());
    }

    let liquidity = position.liquidity();
    let sqrt_from = from.sqrt()?;
    let sqrt_to = to.sqrt()?;
    let base = get_amount0_delta(liquidity, sqrt_from, sqrt_to)?;
    let quote = get_amount1_delta(liquidity, sqrt_from, sqrt_to);

    if to > from {
        Ok(SwapQuote {
            amount_in: quote,
            amount_out: base,
            notional: quote,
            direction: Some(SwapDirection::QuoteForBase),
        })
    } else {
        Ok(SwapQuote {
            amount_in: base,
            amount_out: quote,
            notional: quote,
            direction: Some(SwapDirection::BaseForQuote),
        })
    }
}

/// Liquidity whose position over `range` is worth `capital` at `price`.
pub fn liquidity_for_value(
    capital: Decimal,
    price: Price,
    range: &PriceRange,
) -> Result<Decimal, DomainError> {
    let unit_value = range_reserves(price, range, Decimal::ONE)?.value_at(price);
    let liquidity = capital
        .checked_div(unit_value)
        .ok_or(DomainError::Arithmetic("zero value per unit of liquidity"))?;
    if liquidity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveLiquidity(liquidity));
    }
    Ok(liquidity)
}

/// Largest liquidity that the given reserves can back at `price`.
///
/// Inside the range this is the limiting side of the two reserves.
pub fn liquidity_from_reserves(
    base: Decimal,
    quote: Decimal,
    price: Price,
    range: &PriceRange,
) -> Result<Decimal, DomainError> {
    let sqrt_lower = range.sqrt_lower();
    let sqrt_upper = range.sqrt_upper();

    let liquidity = if price <= range.lower_price() {
        get_liquidity_for_amount0(base, sqrt_lower, sqrt_upper)?
    } else if price >= range.upper_price() {
        get_liquidity_for_amount1(quote, sqrt_lower, sqrt_upper)?
    } else {
        let sqrt_price = price.sqrt()?;
        let from_base = get_liquidity_for_amount0(base, sqrt_price, sqrt_upper)?;
        let from_quote = get_liquidity_for_amount1(quote, sqrt_lower, sqrt_price)?;
        from_base.min(from_quote)
    };
    if liquidity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveLiquidity(liquidity));
    }
    Ok(liquidity)
}
