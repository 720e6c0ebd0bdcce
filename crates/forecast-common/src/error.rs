//! Error types shared by the forecast services.

use thiserror::Error;

/// Result type alias using ForecastError.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Validation errors for values that cross crate boundaries.
#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error("Invalid grid spacing {step}: {reason}")]
    InvalidGridSpacing { step: f64, reason: String },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Invalid WKT geometry: {0}")]
    InvalidWkt(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}
