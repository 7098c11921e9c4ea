//! Domain model for concentrated liquidity LVR accounting.
//!
//! This crate holds the pieces every other crate in the workspace builds on:
//!
//! - [`value_objects`]: prices, ranges, per-step results and run summaries
//! - [`entities`]: validated candles, candle series and liquidity positions
//! - [`math`]: concentrated and constant-product reserve, value and swap math
//! - [`fees`]: static, dynamic and volatility-regime fee policies
//! - [`metrics`]: LVR, impermanent loss, opportunity cost and fee yield
//! - [`error`]: the data-integrity / configuration / domain error taxonomy

pub mod entities;
pub mod enums;
pub mod error;
pub mod fees;
pub mod math;
pub mod metrics;
pub mod value_objects;

pub use error::{ConfigurationError, DataIntegrityError, DomainError, LvrError};
