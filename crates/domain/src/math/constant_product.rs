//! Full-range constant-product math (`x * y = k`).
//!
//! A full-range position holds `x = L / sqrt(P)` base and `y = L * sqrt(P)`
//! quote at every price, so `x * y = L^2` and it never leaves its range.

use crate::error::DomainError;
use crate::fees::BPS_DENOMINATOR;
use crate::math::concentrated_liquidity::{Reserves, SwapDirection, SwapQuote};
use crate::value_objects::price::Price;
use rust_decimal::Decimal;

/// Output for `amount_in` against a constant-product pool.
///
/// formula: dy = y * dx / (x + dx)
/// taking fee into account: dy = y * (dx * (1 - fee)) / (x + (dx * (1 - fee)))
pub fn calculate_out_amount(
    amount_in: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
    fee_bps: Decimal,
) -> Result<Decimal, DomainError> {
    if amount_in.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Err(DomainError::Arithmetic("reserves must be positive"));
    }

    let amount_in_with_fee = amount_in * (BPS_DENOMINATOR - fee_bps) / BPS_DENOMINATOR;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(DomainError::Arithmetic("constant product overflow"))?;
    numerator
        .checked_div(reserve_in + amount_in_with_fee)
        .ok_or(DomainError::Arithmetic("constant product overflow"))
}

/// Reserves of full-range liquidity `liquidity` at `price`.
pub fn reserves_at(price: Price, liquidity: Decimal) -> Result<Reserves, DomainError> {
    let sqrt_price = price.sqrt()?;
    let base = liquidity
        .checked_div(sqrt_price)
        .ok_or(DomainError::Arithmetic("zero sqrt price"))?;
    Ok(Reserves {
        base,
        quote: liquidity * sqrt_price,
    })
}

/// Liquidity worth `capital` at `price`: `L = capital / (2 sqrt(P))`.
pub fn liquidity_for_value(capital: Decimal, price: Price) -> Result<Decimal, DomainError> {
    let liquidity = capital
        .checked_div(Decimal::TWO * price.sqrt()?)
        .ok_or(DomainError::Arithmetic("zero sqrt price"))?;
    if liquidity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveLiquidity(liquidity));
    }
    Ok(liquidity)
}

/// Largest full-range liquidity the given reserves back at `price`.
pub fn liquidity_from_reserves(
    base: Decimal,
    quote: Decimal,
    price: Price,
) -> Result<Decimal, DomainError> {
    let sqrt_price = price.sqrt()?;
    let from_quote = quote
        .checked_div(sqrt_price)
        .ok_or(DomainError::Arithmetic("zero sqrt price"))?;
    let liquidity = (base * sqrt_price).min(from_quote);
    if liquidity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveLiquidity(liquidity));
    }
    Ok(liquidity)
}

/// Arbitrage trade that moves a full-range pool from `price_from` to `price_to`.
///
/// The input leg is what the pool needs to sit at the target price; the output
/// leg follows from the invariant on the starting reserves.
pub fn swap_to_price(
    price_from: Price,
    price_to: Price,
    liquidity: Decimal,
) -> Result<SwapQuote, DomainError> {
    if price_from == price_to {
        return Ok(SwapQuote::default());
    }
    let before = reserves_at(price_from, liquidity)?;
    let after = reserves_at(price_to, liquidity)?;

    if price_to > price_from {
        let amount_in = after.quote - before.quote;
        let amount_out = calculate_out_amount(amount_in, before.quote, before.base, Decimal::ZERO)?;
        Ok(SwapQuote {
            amount_in,
            amount_out,
            notional: amount_in,
            direction: Some(SwapDirection::QuoteForBase),
        })
    } else {
        let amount_in = after.base - before.base;
        let amount_out = calculate_out_amount(amount_in, before.base, before.quote, Decimal::ZERO)?;
        Ok(SwapQuote {
            amount_in,
            amount_out,
            notional: amount_out,
            direction: Some(SwapDirection::BaseForQuote),
        })
    }
}
