//! Error types for the ingestion crate.

use std::fmt;

use forecast_common::LayerRequest;
use grib_decoder::DecodeError;
use storage::StorageError;
use thiserror::Error;

/// Errors raised while building or querying the offset index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read index file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed index line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("No offset for {parameter}:{layer}")]
    OffsetNotFound { parameter: String, layer: String },
}

/// Errors raised by a single HTTP transfer.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Transfer of {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Download gate closed")]
    GateClosed,
}

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to decode GRIB2 data: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Aggregate map is unusable after a writer panicked")]
    AggregationConflict,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Failed to persist observations: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Layers(#[from] LayerErrors),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Every layer failure of one forecast hour.
#[derive(Debug, Default)]
pub struct LayerErrors {
    pub forecast_hour: u32,
    pub failures: Vec<(LayerRequest, IngestionError)>,
}

impl LayerErrors {
    pub fn new(forecast_hour: u32) -> Self {
        Self {
            forecast_hour,
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, layer: LayerRequest, error: IngestionError) {
        self.failures.push((layer, error));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for LayerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forecast hour {}: {} layer(s) failed",
            self.forecast_hour,
            self.failures.len()
        )?;
        for (layer, error) in &self.failures {
            write!(f, "\n  {}: {}", layer, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for LayerErrors {}

/// Every failure collected across a run, in the order they were observed.
#[derive(Debug, Default)]
pub struct RunErrors {
    pub errors: Vec<IngestionError>,
}

impl RunErrors {
    pub fn push(&mut self, error: IngestionError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for RunErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s) during run", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RunErrors {}
