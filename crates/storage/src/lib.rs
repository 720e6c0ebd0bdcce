//! Storage for the forecast grid and its time series.
//!
//! Provides:
//! - PostGIS-backed grid population and observation upserts
//! - Multi-segment spatial query construction
//! - Store traits consumed by the loader and the API

pub mod error;
pub mod postgres;
pub mod query;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use postgres::{GridInit, PostgresStore};
pub use query::{group_by_shape, ForecastRow, SegmentQuery, ShapeSeries, KELVIN_OFFSET};
pub use traits::{ObservationStore, SegmentSource, MAX_BATCH_SIZE};
