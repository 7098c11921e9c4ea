//! Backtest harness: windowing, parameter sweeps, summaries and ranking.
//!
//! A [`Backtest`] resolves a [`BacktestConfig`] against the trailing window of a
//! price series and runs one decomposition. A [`ParamSweep`] expands a
//! [`SweepGrid`], validates every point, then runs them on the rayon pool.

pub mod config;
pub mod error;
pub mod harness;
pub mod objective;
pub mod summary;

pub use config::{BacktestConfig, RangeSpec, SweepGrid};
pub use error::BacktestError;
pub use harness::{Backtest, CompletedRun, ParamSweep, PoolComparison, RunOutcome, SweepOutcome};
pub use objective::{Objective, ObjectiveFunction, rank};
pub use summary::summarize;
