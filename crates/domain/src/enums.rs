use serde::{Deserialize, Serialize};
use std::fmt;

/// How the swap fee reacts to price movement.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FeeMode {
    /// Fixed fee regardless of the oracle step.
    Static,
    /// Base fee plus a sensitivity times the oracle step.
    #[default]
    Dynamic,
    /// Calm or volatile fee depending on rolling volatility against its mean.
    Regime,
}

impl fmt::Display for FeeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::Regime => write!(f, "regime"),
        }
    }
}

/// Shape of the liquidity curve a position sits on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Liquidity bounded to a price range.
    #[default]
    Concentrated,
    /// Full-range `x * y = k` pool.
    ConstantProduct,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concentrated => write!(f, "concentrated"),
            Self::ConstantProduct => write!(f, "constant_product"),
        }
    }
}

/// Where the fee-generating notional of a step comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeSource {
    /// Notional of the arbitrage trade that moves the position to the new price.
    #[default]
    Arbitrage,
    /// Observed quote-currency volume of the candle.
    Observed,
}

/// How interest on committed capital accrues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestMode {
    /// Simple interest on the initial capital.
    #[default]
    Simple,
    /// Interest compounds on capital plus accrued interest.
    Compound,
}
