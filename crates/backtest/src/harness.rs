//! Single runs and parameter sweeps over a trailing window.

use crate::config::{BacktestConfig, SweepGrid};
use crate::error::BacktestError;
use crate::objective::{ObjectiveFunction, rank};
use crate::summary::summarize;
use clmm_lvr_data::repositories::SweepTableRow;
use clmm_lvr_domain::entities::CandleSeries;
use clmm_lvr_domain::enums::PoolKind;
use clmm_lvr_domain::value_objects::{BacktestSummary, ParamKey};
use clmm_lvr_domain::{ConfigurationError, LvrError};
use clmm_lvr_simulation::engine::{Decomposition, IncompleteRun, decompose};
use clmm_lvr_simulation::state::SimulationConfig;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

/// A finished run and its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    /// Parameter combination.
    pub key: ParamKey,
    /// Resolved engine configuration.
    pub config: SimulationConfig,
    /// Per-step rows and final state.
    pub decomposition: Decomposition,
    /// Aggregates over the rows.
    pub summary: BacktestSummary,
}

/// A position and a full-range position with the same capital and fees,
/// run over the same window.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolComparison {
    /// The configured position.
    pub position: CompletedRun,
    /// Its constant-product counterpart.
    pub full_range: CompletedRun,
}

impl PoolComparison {
    /// Net PnL of the configured position minus that of the full-range one.
    #[must_use]
    pub fn net_pnl_advantage(&self) -> Decimal {
        self.position.summary.net_pnl - self.full_range.summary.net_pnl
    }
}

/// Outcome of one run within a sweep.
pub type RunOutcome = Result<CompletedRun, IncompleteRun>;

fn execute(window: &CandleSeries, config: SimulationConfig) -> RunOutcome {
    let key = config.param_key();
    let decomposition = decompose(window, config.clone())?;
    match summarize(&decomposition, config.capital_value) {
        Ok(summary) => Ok(CompletedRun {
            key,
            config,
            decomposition,
            summary,
        }),
        Err(e) => {
            let step = decomposition.results.len().saturating_sub(1);
            Err(IncompleteRun {
                partial: decomposition.results,
                step,
                error: LvrError::at_step(step, e),
            })
        }
    }
}

/// One configured backtest.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    /// Validates `config` up front.
    ///
    /// # Errors
    /// The first [`ConfigurationError`] found.
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// The trailing `window_days` of `series`.
    ///
    /// # Errors
    /// [`ConfigurationError::ZeroWindow`].
    pub fn window(&self, series: &CandleSeries) -> Result<CandleSeries, ConfigurationError> {
        series.window_last_days(self.config.window_days)
    }

    /// Runs the decomposition over the window, entering at its first close.
    ///
    /// # Errors
    /// [`BacktestError::Configuration`] if the range cannot be resolved, or
    /// [`BacktestError::Incomplete`] carrying the partial rows.
    pub fn run(&self, series: &CandleSeries) -> Result<CompletedRun, BacktestError> {
        let window = self.window(series)?;
        let config = self.config.simulation_config(window.first().close())?;
        info!(
            key = %config.param_key(),
            candles = window.len(),
            from = %window.first().timestamp(),
            to = %window.last().timestamp(),
            "Running backtest"
        );
        Ok(execute(&window, config)?)
    }

    /// Runs this backtest and its constant-product twin.
    ///
    /// # Errors
    /// Same as [`Backtest::run`], for either run.
    pub fn compare(&self, series: &CandleSeries) -> Result<PoolComparison, BacktestError> {
        let twin = Self {
            config: self.config.clone().with_pool(PoolKind::ConstantProduct),
        };
        let position = self.run(series)?;
        let full_range = twin.run(series)?;
        info!(
            advantage = %(position.summary.net_pnl - full_range.summary.net_pnl),
            "Compared against full range"
        );
        Ok(PoolComparison {
            position,
            full_range,
        })
    }

    /// A sweep over `grid` with this backtest as the base.
    ///
    /// # Errors
    /// The first invalid grid point.
    pub fn sweep(&self, grid: &SweepGrid) -> Result<ParamSweep, ConfigurationError> {
        ParamSweep::new(&self.config, grid)
    }
}

/// Runs every point of a validated grid, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    configs: Vec<BacktestConfig>,
    window_days: u32,
    parallel: bool,
}

impl ParamSweep {
    /// Expands and validates the grid; nothing runs until [`ParamSweep::run`].
    ///
    /// # Errors
    /// The first [`ConfigurationError`] in `base` or any grid point.
    pub fn new(base: &BacktestConfig, grid: &SweepGrid) -> Result<Self, ConfigurationError> {
        base.validate()?;
        let configs = grid.generate_configs(base)?;
        Ok(Self {
            configs,
            window_days: base.window_days,
            parallel: base.parallel,
        })
    }

    /// Enables or disables parallel execution.
    #[must_use]
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Runs every grid point over the trailing window of `series`.
    ///
    /// Ranges are resolved against the window's first close before any run
    /// starts. A run that halts is kept as incomplete; it does not stop the others.
    ///
    /// # Errors
    /// A [`ConfigurationError`] from windowing or range resolution.
    pub fn run(&self, series: &CandleSeries) -> Result<SweepOutcome, ConfigurationError> {
        let window = series.window_last_days(self.window_days)?;
        let entry = window.first().close();
        let configs = self
            .configs
            .iter()
            .map(|c| c.simulation_config(entry))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            runs = configs.len(),
            parallel = self.parallel,
            candles = window.len(),
            "Starting sweep"
        );

        let outcomes: Vec<(ParamKey, RunOutcome)> = if self.parallel {
            configs
                .into_par_iter()
                .map(|c| (c.param_key(), execute(&window, c)))
                .collect()
        } else {
            configs
                .into_iter()
                .map(|c| (c.param_key(), execute(&window, c)))
                .collect()
        };

        let outcome = SweepOutcome {
            runs: outcomes.into_iter().collect(),
        };
        info!(
            completed = outcome.completed().count(),
            incomplete = outcome.incomplete().count(),
            "Sweep finished"
        );
        Ok(outcome)
    }
}

/// Sweep results keyed by parameter combination.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    runs: BTreeMap<ParamKey, RunOutcome>,
}

impl SweepOutcome {
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &ParamKey) -> Option<&RunOutcome> {
        self.runs.get(key)
    }

    /// All outcomes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &RunOutcome)> {
        self.runs.iter()
    }

    pub fn completed(&self) -> impl Iterator<Item = &CompletedRun> {
        self.runs.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn incomplete(&self) -> impl Iterator<Item = (&ParamKey, &IncompleteRun)> {
        self.runs
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
    }

    /// Completed runs, best first.
    #[must_use]
    pub fn ranked(&self, objective: &dyn ObjectiveFunction) -> Vec<&CompletedRun> {
        rank(self.completed(), objective)
    }

    /// One table row per run, in key order.
    #[must_use]
    pub fn table_rows(&self) -> Vec<SweepTableRow> {
        self.runs
            .iter()
            .map(|(key, outcome)| match outcome {
                Ok(run) => SweepTableRow {
                    key: *key,
                    summary: Some(run.summary.clone()),
                    steps: run.decomposition.results.len(),
                    error: None,
                },
                Err(incomplete) => SweepTableRow {
                    key: *key,
                    summary: None,
                    steps: incomplete.partial.len(),
                    error: Some(incomplete.error.to_string()),
                },
            })
            .collect()
    }
}
