//! Run controller: one task per forecast hour, then conversion and persistence.

use std::path::PathBuf;
use std::sync::Arc;

use forecast_common::{ModelCycle, Observation};
use grib_decoder::GridDecoder;
use metrics::counter;
use storage::ObservationStore;
use tracing::{error, info, instrument, warn};

use crate::aggregate::CellAggregator;
use crate::error::{IngestionError, LayerErrors, Result, RunErrors};
use crate::extract::LayerExtractor;
use crate::fetch::RangeFetcher;
use crate::index::{ByteRange, OffsetIndex};
use crate::noaa::NoaaSource;

/// Knobs for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub forecast_hours: Vec<u32>,
    /// Rows per write transaction.
    pub batch_size: usize,
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forecast_hours: (0..=12).step_by(3).collect(),
            batch_size: storage::MAX_BATCH_SIZE,
            work_dir: PathBuf::from("./grib"),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Aggregated (cell, hour) records.
    pub records: usize,
    /// Rows reported written by the store.
    pub persisted: u64,
    /// Non-fatal failures: failed layers and the failed write batch, if any.
    pub errors: RunErrors,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<RangeFetcher>,
    extractor: LayerExtractor,
    source: NoaaSource,
    store: Arc<dyn ObservationStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<RangeFetcher>,
        decoder: Arc<dyn GridDecoder>,
        source: NoaaSource,
        store: Arc<dyn ObservationStore>,
        config: PipelineConfig,
    ) -> Self {
        let extractor = LayerExtractor::new(
            fetcher.clone(),
            decoder,
            source.clone(),
            config.work_dir.clone(),
        );
        Self {
            fetcher,
            extractor,
            source,
            store,
            config,
        }
    }

    /// Ingest every configured forecast hour of `cycle`.
    ///
    /// Layer and write failures are collected into the report. A failed
    /// index build fails the whole run, but only after every hour task has
    /// finished.
    #[instrument(skip(self), fields(cycle = %cycle))]
    pub async fn run(&self, cycle: ModelCycle) -> Result<RunReport> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let aggregator = Arc::new(CellAggregator::new());
        let mut handles = Vec::with_capacity(self.config.forecast_hours.len());
        for &forecast_hour in &self.config.forecast_hours {
            let this = self.clone();
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                this.run_hour(cycle, forecast_hour, &aggregator).await
            }));
        }

        let mut report = RunReport::default();
        let mut fatal: Option<IngestionError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(Ok(points))) => info!(points = points, "Forecast hour aggregated"),
                Ok(Ok(Err(layer_errors))) => report.errors.push(layer_errors.into()),
                Ok(Err(e)) => {
                    error!(error = %e, "Forecast hour failed");
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Forecast hour task panicked");
                    if fatal.is_none() {
                        fatal = Some(IngestionError::Task(e.to_string()));
                    }
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        let records = Arc::try_unwrap(aggregator)
            .map_err(|_| IngestionError::AggregationConflict)?
            .into_records()?;
        report.records = records.len();

        let observations: Vec<Observation> =
            records.iter().map(|r| r.to_observation(&cycle)).collect();

        match self.persist(&observations).await {
            Ok(persisted) => report.persisted = persisted,
            Err((persisted, e)) => {
                report.persisted = persisted;
                report.errors.push(e);
            }
        }

        info!(
            records = report.records,
            persisted = report.persisted,
            failures = report.errors.len(),
            "Run finished"
        );
        Ok(report)
    }

    /// Outer error: the hour cannot run at all. Inner error: some layers failed.
    #[instrument(skip(self, cycle, aggregator))]
    async fn run_hour(
        &self,
        cycle: ModelCycle,
        forecast_hour: u32,
        aggregator: &CellAggregator,
    ) -> Result<std::result::Result<usize, LayerErrors>> {
        let index = self.load_index(&cycle, forecast_hour).await?;
        info!(entries = index.len(), "Offset index loaded");

        Ok(self
            .extractor
            .extract_hour(&cycle, forecast_hour, &index, aggregator)
            .await)
    }

    async fn load_index(&self, cycle: &ModelCycle, forecast_hour: u32) -> Result<OffsetIndex> {
        let path = self.config.work_dir.join(format!(
            "{}_{}.idx",
            cycle.date_stamp(),
            self.source.file_name(cycle, forecast_hour)
        ));

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let url = self.source.index_url(cycle, forecast_hour);
            self.fetcher
                .fetch("index", &path, &url, ByteRange::FULL)
                .await?;
        }

        Ok(OffsetIndex::from_file(&path).await?)
    }

    /// Write in consecutive batches; stop at the first failed batch.
    ///
    /// Batches committed before the failure stay committed.
    async fn persist(
        &self,
        observations: &[Observation],
    ) -> std::result::Result<u64, (u64, IngestionError)> {
        let batch_size = self.config.batch_size.max(1);
        let mut persisted = 0u64;

        for (i, batch) in observations.chunks(batch_size).enumerate() {
            match self.store.write_observations(batch).await {
                Ok(rows) => {
                    persisted += rows;
                    counter!("gfs_observations_persisted_total").increment(rows);
                }
                Err(e) => {
                    warn!(batch = i, error = %e, "Write batch failed");
                    return Err((persisted, e.into()));
                }
            }
        }

        Ok(persisted)
    }
}
