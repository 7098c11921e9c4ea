use clmm_lvr_domain::ConfigurationError;
use clmm_lvr_simulation::engine::IncompleteRun;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a backtest or sweep.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Parameters rejected before any step ran.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`BacktestConfig`](crate::config::BacktestConfig).
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    /// The decomposition halted; its partial rows are kept.
    #[error(transparent)]
    Incomplete(Box<IncompleteRun>),
}

impl From<IncompleteRun> for BacktestError {
    fn from(run: IncompleteRun) -> Self {
        Self::Incomplete(Box::new(run))
    }
}
