//! Loss-versus-rebalancing against a discretely rebalanced benchmark.
//!
//! Over one step the benchmark holds the position's base reserve at the start
//! of the step (the position's delta) and nothing else moves. Because position
//! value is concave in price the LP can only trail the benchmark, so each
//! increment is non-negative up to rounding.

use crate::entities::position::LiquidityPosition;
use crate::error::DomainError;
use crate::math::concentrated_liquidity;
use crate::value_objects::price::Price;
use rust_decimal::Decimal;

/// Rounding noise below which a negative increment is treated as zero.
pub const LVR_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// PnL of holding the position's base reserve at `previous` while price moves to `current`.
pub fn benchmark_pnl(
    previous: Price,
    current: Price,
    position: &LiquidityPosition,
) -> Result<Decimal, DomainError> {
    let delta = concentrated_liquidity::reserves_at(previous, position)?.base;
    Ok(delta * (current.value() - previous.value()))
}

/// Benchmark PnL minus position value change. May carry rounding noise.
fn raw_lvr(
    previous: Price,
    current: Price,
    position: &LiquidityPosition,
) -> Result<Decimal, DomainError> {
    let value_change = concentrated_liquidity::value_at(current, position)?
        - concentrated_liquidity::value_at(previous, position)?;
    Ok(benchmark_pnl(previous, current, position)? - value_change)
}

/// LVR increment for one step, clamped at zero within [`LVR_TOLERANCE`].
///
/// # Errors
/// [`DomainError::NegativeLvr`] when the raw value is below `-LVR_TOLERANCE`.
pub fn lvr_increment(
    previous: Price,
    current: Price,
    position: &LiquidityPosition,
) -> Result<Decimal, DomainError> {
    let raw = raw_lvr(previous, current, position)?;
    if raw < -LVR_TOLERANCE {
        return Err(DomainError::NegativeLvr(raw));
    }
    Ok(raw.max(Decimal::ZERO))
}
