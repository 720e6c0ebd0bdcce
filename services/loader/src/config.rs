//! Loader run configuration.
//!
//! An optional YAML run file provides the defaults; command-line flags
//! override individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ingestion::{NoaaSource, PipelineConfig, DEFAULT_MAX_CONNECTIONS};
use serde::Deserialize;
use storage::MAX_BATCH_SIZE;

/// Forecast hours as an inclusive `start..=end` range walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ForecastHoursConfig {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for ForecastHoursConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: 12,
            step: 3,
        }
    }
}

impl ForecastHoursConfig {
    pub fn hours(&self) -> Vec<u32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize).collect()
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./grib")
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_request_timeout() -> u64 {
    300
}

/// Everything needed to load one cycle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub source: NoaaSource,

    /// Cycle as `YYYYMMDD/HH`; the latest published cycle when absent.
    #[serde(default)]
    pub cycle: Option<String>,

    #[serde(default)]
    pub forecast_hours: ForecastHoursConfig,

    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Simultaneous downloads across all layers and hours.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Observations per write transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Storage grid spacing in degrees; the source resolution when absent.
    #[serde(default)]
    pub grid_step: Option<f64>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: NoaaSource::default(),
            cycle: None,
            forecast_hours: ForecastHoursConfig::default(),
            work_dir: default_work_dir(),
            max_connections: default_max_connections(),
            batch_size: default_batch_size(),
            grid_step: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config from {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse run config from {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            bail!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                self.batch_size
            );
        }
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        if self.forecast_hours.step == 0 {
            bail!("forecast_hours.step must be at least 1");
        }
        if self.forecast_hours.start > self.forecast_hours.end {
            bail!(
                "forecast_hours.start ({}) is after forecast_hours.end ({})",
                self.forecast_hours.start,
                self.forecast_hours.end
            );
        }
        // Cell ids are only unique and joinable at the spacing the data is published on.
        let data_step = self.source.resolution.degrees();
        if (self.grid_step() - data_step).abs() > f64::EPSILON {
            bail!(
                "grid_step {} does not match the {} data spacing of {} degrees",
                self.grid_step(),
                self.source.resolution,
                data_step
            );
        }
        Ok(())
    }

    pub fn grid_step(&self) -> f64 {
        self.grid_step.unwrap_or_else(|| self.source.resolution.degrees())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            forecast_hours: self.forecast_hours.hours(),
            batch_size: self.batch_size,
            work_dir: self.work_dir.clone(),
        }
    }
}
