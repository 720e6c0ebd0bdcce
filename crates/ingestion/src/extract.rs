//! Per-layer extraction: locate, fetch, decode and aggregate one GRIB2 message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use forecast_common::{LayerRequest, ModelCycle, LAYER_CATALOG};
use futures::future::join_all;
use grib_decoder::{DecodeError, GridDecoder};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::CellAggregator;
use crate::error::{IngestionError, LayerErrors, Result};
use crate::fetch::RangeFetcher;
use crate::field::ScalarField;
use crate::index::OffsetIndex;
use crate::noaa::NoaaSource;

/// Local cache file for one layer of one forecast hour.
pub fn layer_path(
    work_dir: &Path,
    cycle: &ModelCycle,
    forecast_hour: u32,
    layer: &LayerRequest,
) -> PathBuf {
    work_dir.join(format!(
        "{}_{:02}_{:02}_{}_{:03}_{}",
        cycle.date.year(),
        cycle.date.month(),
        cycle.date.day(),
        cycle.hour_stamp(),
        forecast_hour,
        layer.file_stem()
    ))
}

/// Pulls every catalog layer of a forecast hour into a [`CellAggregator`].
#[derive(Clone)]
pub struct LayerExtractor {
    fetcher: Arc<RangeFetcher>,
    decoder: Arc<dyn GridDecoder>,
    source: NoaaSource,
    work_dir: PathBuf,
}

impl LayerExtractor {
    pub fn new(
        fetcher: Arc<RangeFetcher>,
        decoder: Arc<dyn GridDecoder>,
        source: NoaaSource,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            decoder,
            source,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run every catalog layer concurrently and wait for all of them.
    ///
    /// Returns the number of points merged; the error lists every failed layer.
    #[instrument(skip(self, index, aggregator), fields(cycle = %cycle))]
    pub async fn extract_hour(
        &self,
        cycle: &ModelCycle,
        forecast_hour: u32,
        index: &OffsetIndex,
        aggregator: &CellAggregator,
    ) -> std::result::Result<usize, LayerErrors> {
        let results = join_all(LAYER_CATALOG.iter().map(|layer| async move {
            let outcome = self
                .extract_layer(cycle, forecast_hour, layer, index, aggregator)
                .await;
            (*layer, outcome)
        }))
        .await;

        let mut errors = LayerErrors::new(forecast_hour);
        let mut merged = 0;
        for (layer, outcome) in results {
            match outcome {
                Ok(points) => merged += points,
                Err(e) => {
                    counter!("gfs_layer_failures_total").increment(1);
                    warn!(layer = %layer, error = %e, "Layer extraction failed");
                    errors.push(layer, e);
                }
            }
        }

        errors.into_result().map(|_| merged)
    }

    #[instrument(skip(self, index, aggregator), fields(layer = %layer))]
    pub async fn extract_layer(
        &self,
        cycle: &ModelCycle,
        forecast_hour: u32,
        layer: &LayerRequest,
        index: &OffsetIndex,
        aggregator: &CellAggregator,
    ) -> Result<usize> {
        let path = layer_path(&self.work_dir, cycle, forecast_hour, layer);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Layer already cached, skipping download");
        } else {
            let range = index.get_offset(layer.parameter.short_name(), layer.layer)?;
            let url = self.source.grib_url(cycle, forecast_hour);
            self.fetcher
                .fetch(&layer.to_string(), &path, &url, range)
                .await?;
        }

        let field = self.decode_file(&path).await?;
        let merged = aggregator.put_field(&field, forecast_hour, layer.parameter)?;

        info!(
            forecast_hour = forecast_hour,
            rows = field.geometry.rows,
            cols = field.geometry.cols,
            points = merged,
            "Layer aggregated"
        );
        Ok(merged)
    }

    /// Decode a cached slice that must hold exactly one message.
    async fn decode_file(&self, path: &Path) -> Result<ScalarField> {
        let data = tokio::fs::read(path).await?;
        let decoder = self.decoder.clone();

        let mut messages = tokio::task::spawn_blocking(move || decoder.decode(&data))
            .await
            .map_err(|e| IngestionError::Task(e.to_string()))??;

        if messages.len() != 1 {
            return Err(DecodeError::MessageCount {
                expected: 1,
                found: messages.len(),
            }
            .into());
        }

        let message = messages.remove(0);
        Ok(ScalarField::try_from(message)?)
    }
}
