use async_trait::async_trait;
use forecast_common::{Observation, QuerySegment};

use crate::error::StorageResult;
use crate::query::ForecastRow;

/// Largest batch accepted by a single observation write.
pub const MAX_BATCH_SIZE: usize = 100;

/// Write side: persists converted observations.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Upsert one batch of at most [`MAX_BATCH_SIZE`] rows in one transaction.
    async fn write_observations(&self, batch: &[Observation]) -> StorageResult<u64>;
}

/// Read side: answers segment queries.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn forecast_by_segments(&self, segments: &[QuerySegment])
        -> StorageResult<Vec<ForecastRow>>;
}
