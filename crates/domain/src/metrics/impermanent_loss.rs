use super::ImpermanentLoss;
use crate::entities::position::LiquidityPosition;
use crate::error::DomainError;
use crate::math::concentrated_liquidity::{self, Reserves};
use crate::value_objects::price::Price;

/// Compares the position at `price` with holding `initial` reserves.
///
/// `initial` is the reserve split at entry; holding it is marked to `price`.
pub fn impermanent_loss(
    price: Price,
    position: &LiquidityPosition,
    initial: &Reserves,
) -> Result<ImpermanentLoss, DomainError> {
    let value_held = initial.value_at(price);
    let value_lp = concentrated_liquidity::value_at(price, position)?;

    let absolute_loss = value_lp - value_held;
    let percentage_loss = absolute_loss
        .checked_div(value_held)
        .ok_or(DomainError::Arithmetic("hold value is zero"))?;
    Ok(ImpermanentLoss {
        absolute_loss,
        percentage_loss,
    })
}
