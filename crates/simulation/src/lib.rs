//! LVR and PnL decomposition engine for a single concentrated liquidity position.
//!
//! The engine replays a validated [`CandleSeries`](clmm_lvr_domain::entities::CandleSeries)
//! through a position sized from a [`SimulationConfig`](state::SimulationConfig) and
//! emits one [`SimulationResult`](clmm_lvr_domain::value_objects::SimulationResult) per
//! candle, splitting the LP result into fees, LVR, impermanent loss and
//! opportunity cost.

pub mod engine;
pub mod event;
pub mod prelude;
pub mod state;
pub mod volume;
