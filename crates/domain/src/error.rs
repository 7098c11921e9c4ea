//! Error taxonomy shared by the loader, the engine and the harness.
//!
//! Three kinds of failure exist and all of them are fatal:
//!
//! - [`DataIntegrityError`]: the input series is unusable (bad rows, ordering, gaps in time)
//! - [`ConfigurationError`]: the parameters are inconsistent, caught before any step runs
//! - [`DomainError`]: a math call received inputs outside its domain

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Field-level problems found while constructing a single candle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCandle {
    /// A price field was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositivePrice {
        /// Name of the offending field.
        field: &'static str,
        /// Value found.
        value: Decimal,
    },
    /// A volume field was negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeVolume {
        /// Name of the offending field.
        field: &'static str,
        /// Value found.
        value: Decimal,
    },
    /// High was below low.
    #[error("high {high} is below low {low}")]
    HighBelowLow {
        /// High price.
        high: Decimal,
        /// Low price.
        low: Decimal,
    },
}

/// The input series violates an ordering or value invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    /// The series contains no candles.
    #[error("price series is empty")]
    EmptySeries,
    /// A row failed candle validation.
    #[error("row {row}: {source}")]
    InvalidCandle {
        /// Zero-based row index.
        row: usize,
        /// What was wrong with it.
        #[source]
        source: InvalidCandle,
    },
    /// A timestamp does not strictly follow its predecessor.
    #[error("row {row}: timestamp {timestamp} does not follow {previous}")]
    NonMonotonicTimestamp {
        /// Zero-based row index.
        row: usize,
        /// Offending timestamp.
        timestamp: DateTime<Utc>,
        /// Timestamp of the previous row.
        previous: DateTime<Utc>,
    },
    /// The elapsed time between two consecutive steps is zero or negative.
    #[error("row {row}: non-positive time delta of {micros}us")]
    NonPositiveTimeDelta {
        /// Zero-based row index.
        row: usize,
        /// Elapsed microseconds.
        micros: i64,
    },
    /// A row could not be parsed.
    #[error("row {row}: {reason}")]
    Malformed {
        /// Zero-based row index.
        row: usize,
        /// Parser message.
        reason: String,
    },
}

/// Inconsistent run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Lower bound is not strictly below upper bound, or a bound is not positive.
    #[error("invalid price range [{lower}, {upper}]")]
    InvalidRange {
        /// Lower bound.
        lower: Decimal,
        /// Upper bound.
        upper: Decimal,
    },
    /// Range width fraction outside (0, 1).
    #[error("range width must be in (0, 1), got {0}")]
    InvalidRangeWidth(Decimal),
    /// Tick pair is not strictly increasing.
    #[error("lower tick {lower} must be below upper tick {upper}")]
    InvalidTickRange {
        /// Lower tick.
        lower: i32,
        /// Upper tick.
        upper: i32,
    },
    /// Capital must be strictly positive.
    #[error("capital value must be positive, got {0}")]
    NonPositiveCapital(Decimal),
    /// Interest rate must be non-negative.
    #[error("annual interest rate must be non-negative, got {0}")]
    NegativeInterestRate(Decimal),
    /// A fee parameter is negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeFeeParameter {
        /// Parameter name.
        field: &'static str,
        /// Value found.
        value: Decimal,
    },
    /// Fee clamp bounds are inverted.
    #[error("min fee {min} bps exceeds max fee {max} bps")]
    FeeBoundsInverted {
        /// Minimum bps.
        min: Decimal,
        /// Maximum bps.
        max: Decimal,
    },
    /// Base fee lies outside the clamp bounds.
    #[error("base fee {base} bps outside clamp [{min}, {max}]")]
    BaseFeeOutsideBounds {
        /// Base bps.
        base: Decimal,
        /// Minimum bps.
        min: Decimal,
        /// Maximum bps.
        max: Decimal,
    },
    /// Backtest window must cover at least one day.
    #[error("window must be at least one day")]
    ZeroWindow,
    /// A sweep axis has no values.
    #[error("sweep axis '{0}' is empty")]
    EmptySweepAxis(&'static str),
    /// A sweep axis lists the same value twice.
    #[error("sweep axis '{axis}' repeats {value}")]
    DuplicateSweepValue {
        /// Axis name.
        axis: &'static str,
        /// Repeated value.
        value: String,
    },
    /// Rolling volatility needs at least two returns per window.
    #[error("volatility window must be at least 2 steps, got {0}")]
    InvalidVolatilityWindow(usize),
    /// Deposited reserves are negative or both zero.
    #[error("invalid deposit of {base} base and {quote} quote")]
    InvalidDeposit {
        /// Base amount.
        base: Decimal,
        /// Quote amount.
        quote: Decimal,
    },
    /// A sweep varies capital, so it cannot start from a fixed deposit.
    #[error("a parameter sweep cannot start from a fixed deposit")]
    DepositInSweep,
}

/// A math call received inputs outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Price must be strictly positive.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    /// Range bounds are invalid.
    #[error("invalid range: lower {lower} must be positive and below upper {upper}")]
    InvalidRange {
        /// Lower bound.
        lower: Decimal,
        /// Upper bound.
        upper: Decimal,
    },
    /// Liquidity must be strictly positive.
    #[error("liquidity must be positive, got {0}")]
    NonPositiveLiquidity(Decimal),
    /// A per-step term that must be non-negative was negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeTerm {
        /// Name of the term.
        field: &'static str,
        /// Value found.
        value: Decimal,
    },
    /// The rebalancing benchmark produced a loss beyond rounding tolerance.
    #[error("negative LVR increment {0} beyond tolerance")]
    NegativeLvr(Decimal),
    /// Decimal arithmetic overflowed or a root / log was undefined.
    #[error("arithmetic failure: {0}")]
    Arithmetic(&'static str),
}

/// Any fatal error raised while loading, configuring or running a decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LvrError {
    /// Input data problem.
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
    /// Parameter problem.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Math domain problem raised at a given step.
    #[error("step {step}: {source}")]
    Domain {
        /// Zero-based step index.
        step: usize,
        /// Underlying error.
        #[source]
        source: DomainError,
    },
}

impl LvrError {
    /// Wraps a domain error with the step at which it happened.
    #[must_use]
    pub fn at_step(step: usize, source: DomainError) -> Self {
        Self::Domain { step, source }
    }
}
