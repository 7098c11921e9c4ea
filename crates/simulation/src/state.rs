//! Simulation configuration and running state.
//!
//! [`SimulationConfig`] is the explicit parameter object passed into every run;
//! [`RunState`] is what the engine carries from one candle to the next.

use chrono::{DateTime, Utc};
use clmm_lvr_domain::ConfigurationError;
use clmm_lvr_domain::enums::{InterestMode, PoolKind, VolumeSource};
use clmm_lvr_domain::fees::FeePolicyConfig;
use clmm_lvr_domain::math::Reserves;
use clmm_lvr_domain::value_objects::{CumulativeTotals, ParamKey, Price, PriceRange};
use rust_decimal::Decimal;

/// Configuration for a decomposition run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Curve the position sits on. Bounds are ignored for a constant-product pool.
    pub pool: PoolKind,
    /// Lower bound of the position range.
    pub lower_price: Decimal,
    /// Upper bound of the position range.
    pub upper_price: Decimal,
    /// Capital committed at the first candle, in quote currency. Opportunity
    /// cost accrues on it.
    pub capital_value: Decimal,
    /// Tokens deposited at the first candle. When set they size liquidity and
    /// their value at entry replaces `capital_value`.
    pub deposit: Option<Reserves>,
    /// Fee policy parameters.
    pub fee_policy: FeePolicyConfig,
    /// Annual rate of the interest-bearing alternative.
    pub annual_interest_rate: Decimal,
    /// Simple or compound accrual.
    pub interest_mode: InterestMode,
    /// Where fee notional comes from.
    pub volume_source: VolumeSource,
}

impl SimulationConfig {
    /// Creates a config for the given range with default capital, fees and rate.
    #[must_use]
    pub fn new(lower_price: Decimal, upper_price: Decimal) -> Self {
        Self {
            pool: PoolKind::Concentrated,
            lower_price,
            upper_price,
            capital_value: Decimal::from(100_000),
            deposit: None,
            fee_policy: FeePolicyConfig::default(),
            annual_interest_rate: Decimal::new(8, 2), // 8%
            interest_mode: InterestMode::Simple,
            volume_source: VolumeSource::Arbitrage,
        }
    }

    /// Sets the curve the position sits on.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolKind) -> Self {
        self.pool = pool;
        self
    }

    /// Sizes liquidity from deposited tokens.
    #[must_use]
    pub fn with_deposit(mut self, deposit: Reserves) -> Self {
        self.deposit = Some(deposit);
        self
    }

    /// Sets the committed capital.
    #[must_use]
    pub fn with_capital(mut self, capital_value: Decimal) -> Self {
        self.capital_value = capital_value;
        self
    }

    /// Sets the fee policy.
    #[must_use]
    pub fn with_fee_policy(mut self, fee_policy: FeePolicyConfig) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    /// Sets the annual interest rate.
    #[must_use]
    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.annual_interest_rate = rate;
        self
    }

    /// Sets the interest accrual mode.
    #[must_use]
    pub fn with_interest_mode(mut self, mode: InterestMode) -> Self {
        self.interest_mode = mode;
        self
    }

    /// Sets the fee notional source.
    #[must_use]
    pub fn with_volume_source(mut self, source: VolumeSource) -> Self {
        self.volume_source = source;
        self
    }

    /// Checks every parameter and returns the validated range, `None` for a
    /// constant-product pool.
    ///
    /// # Errors
    /// The first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<Option<PriceRange>, ConfigurationError> {
        let range = match self.pool {
            PoolKind::Concentrated => Some(self.range()?),
            PoolKind::ConstantProduct => None,
        };

        if let Some(Reserves { base, quote }) = self.deposit {
            if base < Decimal::ZERO || quote < Decimal::ZERO || (base + quote).is_zero() {
                return Err(ConfigurationError::InvalidDeposit { base, quote });
            }
        }
        if self.capital_value <= Decimal::ZERO {
            return Err(ConfigurationError::NonPositiveCapital(self.capital_value));
        }
        if self.annual_interest_rate < Decimal::ZERO {
            return Err(ConfigurationError::NegativeInterestRate(
                self.annual_interest_rate,
            ));
        }
        self.fee_policy.validate()?;
        Ok(range)
    }

    fn range(&self) -> Result<PriceRange, ConfigurationError> {
        let invalid_range = || ConfigurationError::InvalidRange {
            lower: self.lower_price,
            upper: self.upper_price,
        };
        let lower = Price::new(self.lower_price).map_err(|_| invalid_range())?;
        let upper = Price::new(self.upper_price).map_err(|_| invalid_range())?;
        PriceRange::new(lower, upper).map_err(|_| invalid_range())
    }

    /// The key identifying this parameter combination in a results table.
    #[must_use]
    pub fn param_key(&self) -> ParamKey {
        let (lower_price, upper_price) = match self.pool {
            PoolKind::Concentrated => (self.lower_price, self.upper_price),
            PoolKind::ConstantProduct => (Decimal::ZERO, Decimal::ZERO),
        };
        ParamKey {
            pool: self.pool,
            fee_mode: self.fee_policy.mode,
            base_fee_bps: self.fee_policy.base_bps,
            fee_sensitivity_k: self.fee_policy.sensitivity_k,
            lower_price,
            upper_price,
            capital_value: self.capital_value,
        }
    }
}

/// State carried between consecutive candles.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Timestamp of the previous candle.
    pub previous_timestamp: DateTime<Utc>,
    /// Close of the previous candle.
    pub previous_price: Price,
    /// Whether the previous close was inside the range.
    pub in_range: bool,
    /// Totals up to and including the previous candle.
    pub totals: CumulativeTotals,
    /// Value of the discretely rebalanced benchmark.
    pub benchmark_value: Decimal,
}

impl RunState {
    /// State before the first step.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, price: Price, in_range: bool, initial_value: Decimal) -> Self {
        Self {
            previous_timestamp: timestamp,
            previous_price: price,
            in_range,
            totals: CumulativeTotals::default(),
            benchmark_value: initial_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_lvr_domain::enums::FeeMode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::new(dec!(9.5), dec!(10.5));
        assert_eq!(config.capital_value, dec!(100000));
        assert_eq!(config.annual_interest_rate, dec!(0.08));
        assert_eq!(config.fee_policy.mode, FeeMode::Dynamic);
        assert_eq!(config.fee_policy.base_bps, dec!(8));
        assert_eq!(config.interest_mode, InterestMode::Simple);
        assert_eq!(config.volume_source, VolumeSource::Arbitrage);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_range() {
        for (lower, upper) in [(dec!(10.5), dec!(9.5)), (dec!(10), dec!(10)), (dec!(0), dec!(1))] {
            assert_eq!(
                SimulationConfig::new(lower, upper).validate(),
                Err(ConfigurationError::InvalidRange { lower, upper })
            );
        }
    }

    #[test]
    fn test_rejects_bad_capital_and_rate() {
        let base = SimulationConfig::new(dec!(9.5), dec!(10.5));
        assert_eq!(
            base.clone().with_capital(dec!(0)).validate(),
            Err(ConfigurationError::NonPositiveCapital(dec!(0)))
        );
        assert_eq!(
            base.clone().with_interest_rate(dec!(-0.01)).validate(),
            Err(ConfigurationError::NegativeInterestRate(dec!(-0.01)))
        );
        assert!(matches!(
            base.with_fee_policy(FeePolicyConfig::default().with_bounds(dec!(10), dec!(5)))
                .validate(),
            Err(ConfigurationError::FeeBoundsInverted { .. })
        ));
    }

    #[test]
    fn test_param_key() {
        let config = SimulationConfig::new(dec!(9.5), dec!(10.5))
            .with_fee_policy(FeePolicyConfig::fixed(dec!(30)))
            .with_capital(dec!(5000));
        let key = config.param_key();
        assert_eq!(key.fee_mode, FeeMode::Static);
        assert_eq!(key.base_fee_bps, dec!(30));
        assert_eq!(key.capital_value, dec!(5000));
        assert_eq!(key.lower_price, dec!(9.5));
    }

    #[test]
    fn test_constant_product_ignores_bounds() {
        let config = SimulationConfig::new(dec!(0), dec!(0)).with_pool(PoolKind::ConstantProduct);
        assert_eq!(config.validate(), Ok(None));
        let key = config.param_key();
        assert_eq!(key.pool, PoolKind::ConstantProduct);
        assert_eq!(key.lower_price, dec!(0));

        let wide = SimulationConfig::new(dec!(1), dec!(100)).with_pool(PoolKind::ConstantProduct);
        assert_eq!(wide.param_key(), key);
    }

    #[test]
    fn test_rejects_bad_deposit() {
        let base = SimulationConfig::new(dec!(9.5), dec!(10.5));
        for (b, q) in [(dec!(0), dec!(0)), (dec!(-1), dec!(10))] {
            assert_eq!(
                base.clone()
                    .with_deposit(Reserves { base: b, quote: q })
                    .validate(),
                Err(ConfigurationError::InvalidDeposit { base: b, quote: q })
            );
        }
        assert!(base.with_deposit(Reserves { base: dec!(0), quote: dec!(10) }).validate().is_ok());
    }
}
