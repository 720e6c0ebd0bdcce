//! GFS ingestion library.
//!
//! Turns one model cycle into stored observations:
//!
//! - Offset index parsing (`.idx` catalogs)
//! - Gated HTTP range downloads of individual GRIB2 messages
//! - Per-layer decoding into scalar fields
//! - Per-cell aggregation across layers
//! - Conversion and batched persistence

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod field;
pub mod index;
pub mod noaa;
pub mod pipeline;

// Re-exports
pub use aggregate::CellAggregator;
pub use error::{DownloadError, IndexError, IngestionError, LayerErrors, Result, RunErrors};
pub use extract::{layer_path, LayerExtractor};
pub use fetch::{RangeFetcher, DEFAULT_MAX_CONNECTIONS};
pub use field::{GridGeometry, ScalarField};
pub use index::{ByteRange, OffsetIndex};
pub use noaa::{GridResolution, ModelKind, NoaaSource, NOMADS_BASE_URL};
pub use pipeline::{Pipeline, PipelineConfig, RunReport};
