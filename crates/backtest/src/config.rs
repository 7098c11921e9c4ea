//! Backtest configuration, loadable from TOML.
//!
//! ```toml
//! window_days = 90
//! capital_value = 100000
//! annual_interest_rate = 0.08
//!
//! [range]
//! kind = "width"
//! width = 0.10
//!
//! [fee_policy]
//! mode = "dynamic"
//! base_bps = 8
//!
//! [sweep]
//! fee_modes = ["static", "dynamic", "regime"]
//! range_widths = [0.05, 0.10]
//! pools = ["concentrated", "constant_product"]
//! ```

use crate::error::BacktestError;
use clmm_lvr_domain::ConfigurationError;
use clmm_lvr_domain::enums::{FeeMode, InterestMode, PoolKind, VolumeSource};
use clmm_lvr_domain::fees::FeePolicyConfig;
use clmm_lvr_domain::math::{Reserves, tick_to_price};
use clmm_lvr_domain::value_objects::{Price, PriceRange};
use clmm_lvr_simulation::state::SimulationConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

const DEFAULT_WINDOW_DAYS: u32 = 90;

/// How the position range is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RangeSpec {
    /// Explicit price bounds.
    Bounds {
        /// Lower bound.
        lower: Decimal,
        /// Upper bound.
        upper: Decimal,
    },
    /// `[p0 (1 - width), p0 (1 + width)]` around the entry price `p0`.
    Width {
        /// Half-width as a fraction of the entry price, in (0, 1).
        width: Decimal,
    },
    /// Bounds at `1.0001^tick`.
    Ticks {
        /// Lower tick.
        lower_tick: i32,
        /// Upper tick.
        upper_tick: i32,
    },
}

impl Default for RangeSpec {
    fn default() -> Self {
        Self::Width {
            width: Decimal::new(10, 2),
        }
    }
}

impl RangeSpec {
    /// Checks everything that does not depend on the entry price.
    ///
    /// # Errors
    /// [`ConfigurationError::InvalidRange`], [`ConfigurationError::InvalidRangeWidth`]
    /// or [`ConfigurationError::InvalidTickRange`].
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::Bounds { lower, upper } => {
                PriceRange::from_bounds(lower, upper)
                    .map(|_| ())
                    .map_err(|_| ConfigurationError::InvalidRange { lower, upper })
            }
            Self::Width { width } => {
                if width <= Decimal::ZERO || width >= Decimal::ONE {
                    return Err(ConfigurationError::InvalidRangeWidth(width));
                }
                Ok(())
            }
            Self::Ticks {
                lower_tick,
                upper_tick,
            } => self.tick_bounds(lower_tick, upper_tick).map(|_| ()),
        }
    }

    /// Resolves the bounds for a position opened at `entry`.
    ///
    /// # Errors
    /// Same as [`RangeSpec::validate`].
    pub fn resolve(&self, entry: Price) -> Result<(Decimal, Decimal), ConfigurationError> {
        self.validate()?;
        match *self {
            Self::Bounds { lower, upper } => Ok((lower, upper)),
            Self::Width { width } => {
                let p0 = entry.value();
                Ok((p0 * (Decimal::ONE - width), p0 * (Decimal::ONE + width)))
            }
            Self::Ticks {
                lower_tick,
                upper_tick,
            } => self.tick_bounds(lower_tick, upper_tick),
        }
    }

    fn tick_bounds(&self, lower: i32, upper: i32) -> Result<(Decimal, Decimal), ConfigurationError> {
        let invalid = || ConfigurationError::InvalidTickRange { lower, upper };
        if lower >= upper {
            return Err(invalid());
        }
        let lower_price = tick_to_price(lower).map_err(|_| invalid())?;
        let upper_price = tick_to_price(upper).map_err(|_| invalid())?;
        if lower_price >= upper_price {
            return Err(invalid());
        }
        Ok((lower_price.value(), upper_price.value()))
    }
}

/// Parameter grid for a sweep. Every axis must be non-empty and free of repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    /// Fee modes to try.
    pub fee_modes: Vec<FeeMode>,
    /// Base fees in bps. Regime runs ignore this axis.
    pub base_fee_bps: Vec<Decimal>,
    /// Dynamic sensitivities. Static and regime runs ignore this axis.
    pub sensitivity_k: Vec<Decimal>,
    /// Range half-widths around the entry price. Constant-product runs ignore this axis.
    pub range_widths: Vec<Decimal>,
    /// Committed capital values.
    pub capitals: Vec<Decimal>,
    /// Pool curves to compare.
    pub pools: Vec<PoolKind>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            fee_modes: vec![FeeMode::Static, FeeMode::Dynamic],
            base_fee_bps: vec![Decimal::from(5), Decimal::from(8), Decimal::from(30)],
            sensitivity_k: vec![Decimal::new(5, 1), Decimal::ONE, Decimal::TWO],
            range_widths: vec![Decimal::new(5, 2), Decimal::new(10, 2), Decimal::new(20, 2)],
            capitals: vec![Decimal::from(100_000)],
            pools: vec![PoolKind::Concentrated],
        }
    }
}

fn check_axis<T: PartialEq + Display>(axis: &'static str, values: &[T]) -> Result<(), ConfigurationError> {
    if values.is_empty() {
        return Err(ConfigurationError::EmptySweepAxis(axis));
    }
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(ConfigurationError::DuplicateSweepValue {
                axis,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

impl SweepGrid {
    /// Checks that no axis is empty or repeats a value.
    ///
    /// Values are compared numerically, so `0.1` and `0.10` repeat.
    ///
    /// # Errors
    /// [`ConfigurationError::EmptySweepAxis`] or
    /// [`ConfigurationError::DuplicateSweepValue`] for the first bad axis.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_axis("fee_modes", &self.fee_modes)?;
        check_axis("base_fee_bps", &self.base_fee_bps)?;
        check_axis("sensitivity_k", &self.sensitivity_k)?;
        check_axis("range_widths", &self.range_widths)?;
        check_axis("capitals", &self.capitals)?;
        check_axis("pools", &self.pools)
    }

    /// Number of distinct runs in the grid.
    #[must_use]
    pub fn size(&self) -> usize {
        let fee_variants: usize = self
            .fee_modes
            .iter()
            .map(|mode| match mode {
                FeeMode::Static => self.base_fee_bps.len(),
                FeeMode::Dynamic => self.base_fee_bps.len() * self.sensitivity_k.len(),
                FeeMode::Regime => 1,
            })
            .sum();
        let positions: usize = self
            .pools
            .iter()
            .map(|pool| match pool {
                PoolKind::Concentrated => self.range_widths.len(),
                PoolKind::ConstantProduct => 1,
            })
            .sum();
        fee_variants * positions * self.capitals.len()
    }

    /// Fee policies on the grid. Axes a mode ignores collapse to a single point.
    fn fee_policies(&self, base: &FeePolicyConfig) -> Vec<FeePolicyConfig> {
        let mut policies = Vec::new();
        for &mode in &self.fee_modes {
            match mode {
                FeeMode::Static => policies.extend(self.base_fee_bps.iter().map(|&bps| {
                    base.with_mode(mode)
                        .with_base_bps(bps)
                        .with_sensitivity(Decimal::ZERO)
                })),
                FeeMode::Dynamic => {
                    for &bps in &self.base_fee_bps {
                        policies.extend(self.sensitivity_k.iter().map(|&k| {
                            base.with_mode(mode).with_base_bps(bps).with_sensitivity(k)
                        }));
                    }
                }
                FeeMode::Regime => {
                    policies.push(base.with_mode(mode).with_sensitivity(Decimal::ZERO));
                }
            }
        }
        policies
    }

    /// Pool and range pairs on the grid. A constant-product pool has no range
    /// and keeps the base range untouched.
    fn positions(&self, base: &RangeSpec) -> Vec<(PoolKind, RangeSpec)> {
        self.pools
            .iter()
            .flat_map(|&pool| match pool {
                PoolKind::Concentrated => self
                    .range_widths
                    .iter()
                    .map(|&width| (pool, RangeSpec::Width { width }))
                    .collect::<Vec<_>>(),
                PoolKind::ConstantProduct => vec![(pool, *base)],
            })
            .collect()
    }

    /// Expands the grid over `base`, validating every point before returning.
    ///
    /// # Errors
    /// The first [`ConfigurationError`] found in the grid or in any expanded config.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Result<Vec<BacktestConfig>, ConfigurationError> {
        self.validate()?;
        let mut configs = Vec::with_capacity(self.size());

        for fee_policy in self.fee_policies(&base.fee_policy) {
            for (pool, range) in self.positions(&base.range) {
                for &capital in &self.capitals {
                    let config = BacktestConfig {
                        pool,
                        range,
                        capital_value: capital,
                        fee_policy,
                        sweep: None,
                        ..base.clone()
                    };
                    config.validate()?;
                    configs.push(config);
                }
            }
        }

        Ok(configs)
    }
}

/// Everything a backtest needs besides the price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Trailing window in days, counted back from the last candle.
    pub window_days: u32,
    /// Curve the position sits on.
    pub pool: PoolKind,
    /// Position range. Ignored for a constant-product pool.
    pub range: RangeSpec,
    /// Capital committed at entry.
    pub capital_value: Decimal,
    /// Tokens deposited at entry. When set, capital is their value at the
    /// first close and `capital_value` is ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<Reserves>,
    /// Fee policy.
    pub fee_policy: FeePolicyConfig,
    /// Annual rate of the interest-bearing alternative.
    pub annual_interest_rate: Decimal,
    /// Simple or compound accrual.
    pub interest_mode: InterestMode,
    /// Fee notional source.
    pub volume_source: VolumeSource,
    /// Run sweeps on the rayon pool.
    pub parallel: bool,
    /// Optional parameter grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepGrid>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            pool: PoolKind::default(),
            range: RangeSpec::default(),
            capital_value: Decimal::from(100_000),
            deposit: None,
            fee_policy: FeePolicyConfig::default(),
            annual_interest_rate: Decimal::new(8, 2),
            interest_mode: InterestMode::default(),
            volume_source: VolumeSource::default(),
            parallel: true,
            sweep: None,
        }
    }
}

impl BacktestConfig {
    /// Loads a config from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    /// [`BacktestError::Io`] or [`BacktestError::Toml`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BacktestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a config from a TOML string.
    ///
    /// # Errors
    /// [`BacktestError::Toml`] when the document does not match.
    pub fn from_toml(content: &str) -> Result<Self, BacktestError> {
        Ok(toml::from_str(content)?)
    }

    #[must_use]
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolKind) -> Self {
        self.pool = pool;
        self
    }

    /// Sizes the position from deposited tokens.
    #[must_use]
    pub fn with_deposit(mut self, deposit: Reserves) -> Self {
        self.deposit = Some(deposit);
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: RangeSpec) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_capital(mut self, capital_value: Decimal) -> Self {
        self.capital_value = capital_value;
        self
    }

    #[must_use]
    pub fn with_fee_policy(mut self, fee_policy: FeePolicyConfig) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    #[must_use]
    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.annual_interest_rate = rate;
        self
    }

    #[must_use]
    pub fn with_interest_mode(mut self, mode: InterestMode) -> Self {
        self.interest_mode = mode;
        self
    }

    #[must_use]
    pub fn with_volume_source(mut self, source: VolumeSource) -> Self {
        self.volume_source = source;
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_sweep(mut self, grid: SweepGrid) -> Self {
        self.sweep = Some(grid);
        self
    }

    /// Rejects inconsistent parameters before any series is touched.
    ///
    /// # Errors
    /// The first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.window_days == 0 {
            return Err(ConfigurationError::ZeroWindow);
        }
        if self.pool == PoolKind::Concentrated {
            self.range.validate()?;
        }
        if self.capital_value <= Decimal::ZERO {
            return Err(ConfigurationError::NonPositiveCapital(self.capital_value));
        }
        if let Some(Reserves { base, quote }) = self.deposit {
            if base < Decimal::ZERO || quote < Decimal::ZERO || (base + quote).is_zero() {
                return Err(ConfigurationError::InvalidDeposit { base, quote });
            }
            if self.sweep.is_some() {
                return Err(ConfigurationError::DepositInSweep);
            }
        }
        if self.annual_interest_rate < Decimal::ZERO {
            return Err(ConfigurationError::NegativeInterestRate(
                self.annual_interest_rate,
            ));
        }
        self.fee_policy.validate()?;
        if let Some(grid) = &self.sweep {
            grid.validate()?;
        }
        Ok(())
    }

    /// The engine config for a position opened at `entry`.
    ///
    /// # Errors
    /// Any [`ConfigurationError`] from range resolution or engine validation.
    pub fn simulation_config(&self, entry: Price) -> Result<SimulationConfig, ConfigurationError> {
        let (lower, upper) = match self.pool {
            PoolKind::Concentrated => self.range.resolve(entry)?,
            PoolKind::ConstantProduct => (Decimal::ZERO, Decimal::ZERO),
        };
        let mut config = SimulationConfig::new(lower, upper)
            .with_pool(self.pool)
            .with_capital(self.capital_value);
        if let Some(deposit) = self.deposit {
            config = config
                .with_capital(deposit.value_at(entry))
                .with_deposit(deposit);
        }
        let config = config
            .with_fee_policy(self.fee_policy)
            .with_interest_rate(self.annual_interest_rate)
            .with_interest_mode(self.interest_mode)
            .with_volume_source(self.volume_source);
        config.validate()?;
        Ok(config)
    }
}
