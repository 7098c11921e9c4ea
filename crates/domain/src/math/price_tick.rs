use crate::error::DomainError;
use crate::value_objects::price::Price;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Tick base: each tick is a 1 bp price step.
const TICK_BASE: f64 = 1.0001;

/// Returns the price corresponding to a given tick.
/// P = 1.0001 ^ tick
pub fn tick_to_price(tick: i32) -> Result<Price, DomainError> {
    let price_f64 = TICK_BASE.powi(tick);
    let value = Decimal::from_f64(price_f64).ok_or(DomainError::Arithmetic("tick price overflow"))?;
    Price::new(value)
}

/// Returns the nearest tick to a given price.
/// tick = log_1.0001(P)
pub fn price_to_tick(price: Price) -> Result<i32, DomainError> {
    let price_f64 = price
        .value()
        .to_f64()
        .ok_or(DomainError::Arithmetic("price not representable as f64"))?;
    let tick = price_f64.log(TICK_BASE).round();
    tick.to_i32()
        .ok_or(DomainError::Arithmetic("tick out of i32 range"))
}
