use clmm_lvr_domain::DataIntegrityError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing data files.
#[derive(Debug, Error)]
pub enum DataError {
    /// Filesystem failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// CSV reader or writer failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The data violates a series or row invariant.
    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
