//! Common types and utilities shared across the forecast loader and API.

pub mod bbox;
pub mod cell;
pub mod error;
pub mod layer;
pub mod record;
pub mod segment;
pub mod time;

pub use bbox::BoundingBox;
pub use cell::{cell_id, quantize, CellKey, GridCell, GridSpec};
pub use error::{ForecastError, ForecastResult};
pub use layer::{LayerRequest, Parameter, LAYER_CATALOG};
pub use record::{AggregateRecord, Observation, ParameterValues};
pub use segment::QuerySegment;
pub use time::{round_to_cadence, ModelCycle, ValidTime, MODEL_CADENCE_HOURS};
