//! Error handling for the EV propensity pipeline.
//!
//! Every stage reports failures through the single [`Error`] enum; stage
//! errors are fatal to the pipeline run.

use std::io;
use std::path::PathBuf;

/// Specialized error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw survey input could not be loaded or did not match the expected schema
    #[error("data error: {0}")]
    Data(String),

    /// A required source column was absent during feature derivation,
    /// or the alignment invariant was violated
    #[error("feature error: {0}")]
    Feature(String),

    /// Label simulation could not be carried out on the feature table
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Model training or evaluation failed
    #[error("training error: {0}")]
    Training(String),

    /// The classifier did not converge within its iteration budget
    #[error("training error: convergence failed after {iterations} iterations")]
    Convergence {
        /// Iterations spent before giving up
        iterations: usize,
    },

    /// Error opening or reading a file
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// Path of the file or directory being operated on
        path: PathBuf,
        /// Underlying io error
        source: io::Error,
    },

    /// Error processing Parquet data
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error processing Arrow data
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error converting between row structs and record batches
    #[error("serde_arrow error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error reading or writing JSON artifacts
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach a path to an io error
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
