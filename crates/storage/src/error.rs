//! Error types for the storage crate.

use forecast_common::ForecastError;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Batch of {size} rows exceeds the maximum of {max}")]
    BatchSizeExceeded { size: usize, max: usize },

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Invalid(#[from] ForecastError),
}
