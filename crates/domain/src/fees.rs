use crate::entities::CandleSeries;
use crate::enums::FeeMode;
use crate::error::{ConfigurationError, DomainError};
use crate::value_objects::price::Price;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// Basis points per unit.
pub const BPS_DENOMINATOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Maps a step's oracle movement to a fee rate in basis points.
pub trait FeePolicy: Send + Sync {
    /// Fee rate in bps for a step whose oracle step is `oracle_step`.
    fn fee_bps(&self, oracle_step: Decimal) -> Decimal;

    /// Fee rate for step `step` of the series the policy was built for.
    fn fee_bps_at(&self, _step: usize, oracle_step: Decimal) -> Decimal {
        self.fee_bps(oracle_step)
    }

    /// Which mode this policy implements.
    fn mode(&self) -> FeeMode;
}

/// Fixed fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticFee {
    pub base_bps: Decimal,
}

impl FeePolicy for StaticFee {
    fn fee_bps(&self, _oracle_step: Decimal) -> Decimal {
        self.base_bps
    }

    fn mode(&self) -> FeeMode {
        FeeMode::Static
    }
}

/// Base fee plus `k` bps per bp of oracle movement, clamped to `[min_bps, max_bps]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicFee {
    pub base_bps: Decimal,
    pub sensitivity_k: Decimal,
    pub min_bps: Decimal,
    pub max_bps: Decimal,
}

impl FeePolicy for DynamicFee {
    fn fee_bps(&self, oracle_step: Decimal) -> Decimal {
        let raw = self.base_bps + self.sensitivity_k * oracle_step * BPS_DENOMINATOR;
        raw.clamp(self.min_bps, self.max_bps)
    }

    fn mode(&self) -> FeeMode {
        FeeMode::Dynamic
    }
}

/// Sample standard deviation of simple returns over the trailing `window` steps.
///
/// Entry `t` covers the returns ending at candle `t` and stays `None` until
/// `window` returns exist.
pub fn rolling_volatility(
    series: &CandleSeries,
    window: usize,
) -> Result<Vec<Option<Decimal>>, DomainError> {
    if window < 2 {
        return Err(DomainError::Arithmetic("volatility window below 2"));
    }
    let returns = series
        .candles()
        .windows(2)
        .map(|w| {
            w[1].close()
                .value()
                .checked_div(w[0].close().value())
                .map(|ratio| ratio - Decimal::ONE)
                .ok_or(DomainError::Arithmetic("price ratio overflow"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut volatility = vec![None; series.len()];
    let n = Decimal::from(window);
    for t in window..series.len() {
        let slice = &returns[t - window..t];
        let mean = slice.iter().sum::<Decimal>() / n;
        let variance = slice
            .iter()
            .map(|&r| (r - mean) * (r - mean))
            .sum::<Decimal>()
            / Decimal::from(window - 1);
        volatility[t] = Some(
            variance
                .sqrt()
                .ok_or(DomainError::Arithmetic("square root of variance"))?,
        );
    }
    Ok(volatility)
}

/// Calm fee, or the volatile fee on steps whose rolling volatility exceeds
/// its mean over the whole series.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityRegimeFee {
    pub calm_bps: Decimal,
    pub volatile_bps: Decimal,
    volatile: Vec<bool>,
}

impl VolatilityRegimeFee {
    /// Classifies every step of `series`. Steps without a full window are calm.
    pub fn fit(
        series: &CandleSeries,
        window: usize,
        calm_bps: Decimal,
        volatile_bps: Decimal,
    ) -> Result<Self, DomainError> {
        let volatility = rolling_volatility(series, window)?;
        let defined: Vec<Decimal> = volatility.iter().flatten().copied().collect();
        let volatile = if defined.is_empty() {
            vec![false; volatility.len()]
        } else {
            let mean = defined.iter().sum::<Decimal>() / Decimal::from(defined.len());
            volatility
                .iter()
                .map(|v| v.is_some_and(|v| v > mean))
                .collect()
        };
        Ok(Self {
            calm_bps,
            volatile_bps,
            volatile,
        })
    }

    #[must_use]
    pub fn is_volatile(&self, step: usize) -> bool {
        self.volatile.get(step).copied().unwrap_or(false)
    }
}

impl FeePolicy for VolatilityRegimeFee {
    /// Without a step index there is no regime, so the calm fee applies.
    fn fee_bps(&self, _oracle_step: Decimal) -> Decimal {
        self.calm_bps
    }

    fn fee_bps_at(&self, step: usize, _oracle_step: Decimal) -> Decimal {
        if self.is_volatile(step) {
            self.volatile_bps
        } else {
            self.calm_bps
        }
    }

    fn mode(&self) -> FeeMode {
        FeeMode::Regime
    }
}

/// A policy built from [`FeePolicyConfig`] for one series.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfiguredFee {
    Static(StaticFee),
    Dynamic(DynamicFee),
    Regime(VolatilityRegimeFee),
}

impl FeePolicy for ConfiguredFee {
    fn fee_bps(&self, oracle_step: Decimal) -> Decimal {
        match self {
            Self::Static(p) => p.fee_bps(oracle_step),
            Self::Dynamic(p) => p.fee_bps(oracle_step),
            Self::Regime(p) => p.fee_bps(oracle_step),
        }
    }

    fn fee_bps_at(&self, step: usize, oracle_step: Decimal) -> Decimal {
        match self {
            Self::Static(p) => p.fee_bps_at(step, oracle_step),
            Self::Dynamic(p) => p.fee_bps_at(step, oracle_step),
            Self::Regime(p) => p.fee_bps_at(step, oracle_step),
        }
    }

    fn mode(&self) -> FeeMode {
        match self {
            Self::Static(p) => p.mode(),
            Self::Dynamic(p) => p.mode(),
            Self::Regime(p) => p.mode(),
        }
    }
}

/// Fee policy parameters as configured by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicyConfig {
    pub mode: FeeMode,
    pub base_bps: Decimal,
    pub sensitivity_k: Decimal,
    pub min_bps: Decimal,
    pub max_bps: Decimal,
    /// Regime fee in calm steps.
    pub calm_bps: Decimal,
    /// Regime fee when rolling volatility is above its mean.
    pub volatile_bps: Decimal,
    /// Steps in the rolling volatility window.
    pub volatility_window: usize,
}

impl Default for FeePolicyConfig {
    fn default() -> Self {
        Self {
            mode: FeeMode::Dynamic,
            base_bps: Decimal::from(8),
            sensitivity_k: Decimal::ONE,
            min_bps: Decimal::ONE,
            max_bps: Decimal::ONE_HUNDRED,
            calm_bps: Decimal::from(30),
            volatile_bps: Decimal::from(50),
            volatility_window: 24,
        }
    }
}

impl FeePolicyConfig {
    /// A static policy at `base_bps`, clamp bounds left at their defaults.
    #[must_use]
    pub fn fixed(base_bps: Decimal) -> Self {
        Self {
            mode: FeeMode::Static,
            base_bps,
            sensitivity_k: Decimal::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FeeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_base_bps(mut self, base_bps: Decimal) -> Self {
        self.base_bps = base_bps;
        self
    }

    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity_k: Decimal) -> Self {
        self.sensitivity_k = sensitivity_k;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, min_bps: Decimal, max_bps: Decimal) -> Self {
        self.min_bps = min_bps;
        self.max_bps = max_bps;
        self
    }

    /// Sets the regime fees and volatility window.
    #[must_use]
    pub fn with_regime(mut self, calm_bps: Decimal, volatile_bps: Decimal, window: usize) -> Self {
        self.calm_bps = calm_bps;
        self.volatile_bps = volatile_bps;
        self.volatility_window = window;
        self
    }

    /// Checks signs, `min_bps <= base_bps <= max_bps` and, in regime mode, the window.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("base_bps", self.base_bps),
            ("sensitivity_k", self.sensitivity_k),
            ("min_bps", self.min_bps),
            ("max_bps", self.max_bps),
            ("calm_bps", self.calm_bps),
            ("volatile_bps", self.volatile_bps),
        ] {
            if value < Decimal::ZERO {
                return Err(ConfigurationError::NegativeFeeParameter { field, value });
            }
        }
        if self.min_bps > self.max_bps {
            return Err(ConfigurationError::FeeBoundsInverted {
                min: self.min_bps,
                max: self.max_bps,
            });
        }
        if self.base_bps < self.min_bps || self.base_bps > self.max_bps {
            return Err(ConfigurationError::BaseFeeOutsideBounds {
                base: self.base_bps,
                min: self.min_bps,
                max: self.max_bps,
            });
        }
        if self.mode == FeeMode::Regime && self.volatility_window < 2 {
            return Err(ConfigurationError::InvalidVolatilityWindow(
                self.volatility_window,
            ));
        }
        Ok(())
    }

    /// Builds the policy these parameters describe for `series`.
    pub fn fit(&self, series: &CandleSeries) -> Result<ConfiguredFee, DomainError> {
        Ok(match self.mode {
            FeeMode::Static => ConfiguredFee::Static(StaticFee {
                base_bps: self.base_bps,
            }),
            FeeMode::Dynamic => ConfiguredFee::Dynamic(self.as_dynamic()),
            FeeMode::Regime => ConfiguredFee::Regime(VolatilityRegimeFee::fit(
                series,
                self.volatility_window,
                self.calm_bps,
                self.volatile_bps,
            )?),
        })
    }

    /// The dynamic form of these parameters.
    #[must_use]
    pub fn as_dynamic(&self) -> DynamicFee {
        DynamicFee {
            base_bps: self.base_bps,
            sensitivity_k: self.sensitivity_k,
            min_bps: self.min_bps,
            max_bps: self.max_bps,
        }
    }
}

impl FeePolicy for FeePolicyConfig {
    fn fee_bps(&self, oracle_step: Decimal) -> Decimal {
        compute_fee_bps(oracle_step, self)
    }

    fn mode(&self) -> FeeMode {
        self.mode
    }
}

/// Fee rate in bps for `oracle_step` under `config`.
///
/// Regime mode has no volatility history here and charges the calm fee.
#[must_use]
pub fn compute_fee_bps(oracle_step: Decimal, config: &FeePolicyConfig) -> Decimal {
    match config.mode {
        FeeMode::Static => StaticFee {
            base_bps: config.base_bps,
        }
        .fee_bps(oracle_step),
        FeeMode::Dynamic => config.as_dynamic().fee_bps(oracle_step),
        FeeMode::Regime => config.calm_bps,
    }
}

/// Absolute log-return between consecutive observations.
pub fn oracle_step(previous: Price, current: Price) -> Result<Decimal, DomainError> {
    current.abs_log_return(previous)
}
