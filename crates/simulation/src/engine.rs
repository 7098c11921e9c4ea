//! The decomposition engine.
//!
//! Per candle, in time order:
//!
//! 1. oracle step `|ln(p_t / p_{t-1})|`
//! 2. fee rate from the [`FeePolicy`]
//! 3. fee notional from the [`VolumeModel`], only while `p_t` is inside the range
//!    (always, for a full-range position)
//! 4. LVR against the discretely rebalanced benchmark
//! 5. impermanent loss versus holding the entry reserves
//! 6. opportunity cost over the elapsed time, to the microsecond
//!
//! The first candle only opens the position and carries zero step terms.

use crate::event::{EventLog, SimulationEvent};
use crate::state::{RunState, SimulationConfig};
use crate::volume::VolumeModel;
use chrono::TimeDelta;
use clmm_lvr_domain::entities::{Candle, CandleSeries, LiquidityPosition};
use clmm_lvr_domain::fees::{FeePolicy, oracle_step};
use clmm_lvr_domain::math::{Reserves, reserves_at, value_at};
use clmm_lvr_domain::metrics::{
    fees::fee_for_notional,
    impermanent_loss::impermanent_loss,
    lvr::{benchmark_pnl, lvr_increment},
    opportunity_cost::opportunity_cost,
};
use clmm_lvr_domain::value_objects::{
    CumulativeTotals, Price, PriceRange, SimulationResult, StepIncrements,
};
use clmm_lvr_domain::{ConfigurationError, DataIntegrityError, DomainError, LvrError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// A run that halted on a fatal error. Rows computed before the failure are
/// kept in `partial` but never summarised as a finished run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("run halted at step {step} after {} rows: {error}", .partial.len())]
pub struct IncompleteRun {
    /// Rows emitted before the failure.
    pub partial: Vec<SimulationResult>,
    /// Step index at which the run halted.
    pub step: usize,
    /// What went wrong.
    #[source]
    pub error: LvrError,
}

/// A completed decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// One row per candle.
    pub results: Vec<SimulationResult>,
    /// Position opened at the first candle.
    pub position: LiquidityPosition,
    /// Reserves at entry, the hold portfolio.
    pub initial_reserves: Reserves,
    /// Position value at the last close.
    pub final_value: Decimal,
    /// Value of the discretely rebalanced benchmark at the last close.
    pub final_benchmark_value: Decimal,
    /// Range transitions and lifecycle events.
    pub events: EventLog,
}

impl Decomposition {
    /// Cumulative totals at the last row.
    #[must_use]
    pub fn totals(&self) -> CumulativeTotals {
        self.results
            .last()
            .map(SimulationResult::totals)
            .unwrap_or_default()
    }

    /// Net PnL at the last row.
    #[must_use]
    pub fn net_pnl(&self) -> Decimal {
        self.totals().net_pnl()
    }

    /// Number of rows whose close was inside the range.
    #[must_use]
    pub fn steps_in_range(&self) -> usize {
        self.results
            .iter()
            .filter(|r| self.position.is_in_range(r.price()))
            .count()
    }
}

/// Replays candles through one position under a fee policy and a volume model.
#[derive(Debug, Clone)]
pub struct DecompositionEngine<F, V> {
    config: SimulationConfig,
    range: Option<PriceRange>,
    fee_policy: F,
    volume_model: V,
}

impl<F: FeePolicy, V: VolumeModel> DecompositionEngine<F, V> {
    /// Builds an engine with an explicit fee policy and volume model.
    ///
    /// # Errors
    /// Any [`ConfigurationError`] found by [`SimulationConfig::validate`].
    pub fn new(
        config: SimulationConfig,
        fee_policy: F,
        volume_model: V,
    ) -> Result<Self, ConfigurationError> {
        let range = config.validate()?;
        Ok(Self {
            config,
            range,
            fee_policy,
            volume_model,
        })
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Opens the position at `entry`, from the deposit when one is set.
    fn open(&self, entry: Price) -> Result<LiquidityPosition, DomainError> {
        match (&self.config.deposit, &self.range) {
            (Some(deposit), range) => {
                LiquidityPosition::from_reserves(range.clone(), deposit.base, deposit.quote, entry)
            }
            (None, Some(range)) => {
                LiquidityPosition::from_capital(range.clone(), self.config.capital_value, entry)
            }
            (None, None) => {
                LiquidityPosition::full_range_from_capital(self.config.capital_value, entry)
            }
        }
    }

    /// Runs the decomposition over `series`.
    ///
    /// # Errors
    /// An [`IncompleteRun`] carrying the rows computed before the failure.
    pub fn run(&self, series: &CandleSeries) -> Result<Decomposition, IncompleteRun> {
        let span = info_span!(
            "decompose",
            key = %self.config.param_key(),
            candles = series.len()
        );
        let _guard = span.enter();

        let first = series.first();
        let entry = first.close();
        let halt = |partial: Vec<SimulationResult>, step: usize, error: LvrError| {
            warn!(step, error = %error, rows = partial.len(), "Decomposition halted");
            IncompleteRun {
                partial,
                step,
                error,
            }
        };

        let opened = self.open(entry).and_then(|position| {
            let initial = reserves_at(entry, &position)?;
            Ok((position, initial))
        });
        let (position, initial_reserves) = match opened {
            Ok(opened) => opened,
            Err(e) => return Err(halt(Vec::new(), 0, LvrError::at_step(0, e))),
        };
        let initial_value = initial_reserves.value_at(entry);

        let mut events = EventLog::new();
        events.record(SimulationEvent::position_opened(
            0,
            first.timestamp(),
            entry,
            position.capital_value(),
            position.liquidity(),
        ));
        info!(
            pool = %position.pool_kind(),
            entry = %entry,
            liquidity = %position.liquidity(),
            value = %initial_value,
            "Position opened"
        );

        let mut state = RunState::new(
            first.timestamp(),
            entry,
            position.is_in_range(entry),
            initial_value,
        );
        if !state.in_range {
            events.record(SimulationEvent::out_of_range(0, first.timestamp(), entry));
            debug!(step = 0, price = %entry, "Opened out of range");
        }

        let mut results = Vec::with_capacity(series.len());
        let mut last_il = Decimal::ZERO;
        for (step, candle) in series.candles().iter().enumerate() {
            let row = match self.step(step, candle, &position, &initial_reserves, &mut state) {
                Ok(row) => row,
                Err(error) => return Err(halt(results, step, error)),
            };

            let price = candle.close();
            let now_in_range = position.is_in_range(price);
            if step > 0 && now_in_range != state.in_range {
                let event = if now_in_range {
                    SimulationEvent::back_in_range(step, candle.timestamp(), price)
                } else {
                    SimulationEvent::out_of_range(step, candle.timestamp(), price)
                };
                debug!(step, price = %price, in_range = now_in_range, "Range transition");
                events.record(event);
            }

            state.in_range = now_in_range;
            state.previous_timestamp = candle.timestamp();
            state.previous_price = price;
            state.totals = row.totals();
            last_il = row.impermanent_loss_pct();
            results.push(row);
        }

        let last = series.last();
        let final_value = match value_at(last.close(), &position) {
            Ok(v) => v,
            Err(e) => {
                let step = series.len() - 1;
                return Err(halt(results, step, LvrError::at_step(step, e)));
            }
        };
        let net_pnl = state.totals.net_pnl();
        events.record(SimulationEvent::position_closed(
            series.len() - 1,
            last.timestamp(),
            last.close(),
            final_value,
            state.benchmark_value,
            last_il,
            net_pnl,
        ));
        info!(
            fees = %state.totals.fees,
            lvr = %state.totals.lvr,
            opportunity_cost = %state.totals.opportunity_cost,
            net_pnl = %net_pnl,
            "Decomposition complete"
        );

        Ok(Decomposition {
            results,
            position,
            initial_reserves,
            final_value,
            final_benchmark_value: state.benchmark_value,
            events,
        })
    }

    /// Computes one row and advances the benchmark.
    fn step(
        &self,
        step: usize,
        candle: &Candle,
        position: &LiquidityPosition,
        initial: &Reserves,
        state: &mut RunState,
    ) -> Result<SimulationResult, LvrError> {
        let at = |e| LvrError::at_step(step, e);
        let price = candle.close();
        let il = impermanent_loss(price, position, initial).map_err(at)?;

        if step == 0 {
            let increments = StepIncrements {
                impermanent_loss_pct: il.percentage_loss,
                ..StepIncrements::default()
            };
            return SimulationResult::new(candle.timestamp(), price, increments, state.totals)
                .map_err(at);
        }

        let delta = candle.timestamp() - state.previous_timestamp;
        let micros = delta
            .num_microseconds()
            .ok_or(at(DomainError::Arithmetic("time delta overflow")))?;
        if delta <= TimeDelta::zero() {
            return Err(DataIntegrityError::NonPositiveTimeDelta { row: step, micros }.into());
        }

        let previous = state.previous_price;
        let fee_bps = self
            .fee_policy
            .fee_bps_at(step, oracle_step(previous, price).map_err(at)?);
        let notional = if position.is_in_range(price) {
            self.volume_model
                .fee_notional(previous, candle, position)
                .map_err(at)?
        } else {
            Decimal::ZERO
        };

        let increments = StepIncrements {
            fee_accrued: fee_for_notional(notional, fee_bps),
            lvr_increment: lvr_increment(previous, price, position).map_err(at)?,
            impermanent_loss_pct: il.percentage_loss,
            opportunity_cost: opportunity_cost(
                self.config.interest_mode,
                position.capital_value(),
                state.totals.opportunity_cost,
                self.config.annual_interest_rate,
                micros,
            )
            .map_err(at)?,
        };
        state.benchmark_value += benchmark_pnl(previous, price, position).map_err(at)?;

        let totals = state.totals.accrue(&increments);
        SimulationResult::new(candle.timestamp(), price, increments, totals).map_err(at)
    }
}

/// Validates `config`, fits its fee policy to `series` and runs it with the
/// volume source it names.
///
/// # Errors
/// An [`IncompleteRun`] with no rows when the configuration is invalid, or
/// with the rows computed so far when a step fails.
pub fn decompose(
    series: &CandleSeries,
    config: SimulationConfig,
) -> Result<Decomposition, IncompleteRun> {
    let rejected = |error: LvrError| IncompleteRun {
        partial: Vec::new(),
        step: 0,
        error,
    };
    config
        .validate()
        .map_err(|e| rejected(e.into()))?;
    let fee_policy = config
        .fee_policy
        .fit(series)
        .map_err(|e| rejected(LvrError::at_step(0, e)))?;
    let volume_model = config.volume_source;
    let engine = DecompositionEngine::new(config, fee_policy, volume_model)
        .map_err(|e| rejected(e.into()))?;
    engine.run(series)
}
