//! Concentrated and full-range liquidity math on `Decimal` liquidity.

pub mod concentrated_liquidity;
pub mod constant_product;
pub mod price_tick;

pub use concentrated_liquidity::{
    Reserves, SwapDirection, SwapQuote, liquidity_for_value, liquidity_from_reserves,
    marginal_price, reserves_at, swap_to_price, value_at,
};
pub use price_tick::{price_to_tick, tick_to_price};
