use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Expected {expected} message(s), found {found}")]
    MessageCount { expected: usize, found: usize },

    #[error("Unsupported grid definition template 3.{template}")]
    UnsupportedGrid { template: u16 },

    #[error("Grid declares {expected} points but {found} values were decoded")]
    ValueCount { expected: usize, found: usize },

    #[error("Value unpacking failed: {0}")]
    Unpack(String),
}
