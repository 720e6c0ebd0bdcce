//! GFS forecast loader.
//!
//! Loads one model cycle into PostGIS:
//! - Ensures the schema and the storage grid exist
//! - Downloads the tracked layers of every forecast hour through byte ranges
//! - Aggregates them per cell and upserts the observations

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use forecast_common::{GridSpec, ModelCycle};
use grib_decoder::GribCrateDecoder;
use ingestion::{GridResolution, Pipeline, RangeFetcher};
use storage::{GridInit, PostgresStore};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::RunConfig;

/// NOMADS publishes a cycle a few hours after its nominal time.
const PUBLICATION_LAG_HOURS: i64 = 5;

#[derive(Parser, Debug)]
#[command(name = "loader")]
#[command(about = "Load a GFS model cycle into the forecast store")]
struct Args {
    /// YAML run file
    #[arg(short, long, env = "LOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Model cycle as YYYYMMDD/HH (default: latest published)
    #[arg(long)]
    cycle: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Directory for cached index and layer files
    #[arg(long, env = "WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Maximum simultaneous downloads
    #[arg(long)]
    max_connections: Option<usize>,

    /// Published grid resolution (0p25, 0p50, 1p00)
    #[arg(long)]
    resolution: Option<GridResolution>,

    /// Storage grid spacing in degrees
    #[arg(long)]
    grid_step: Option<f64>,

    /// Database pool size
    #[arg(long, default_value = "5")]
    db_connections: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(cycle) = &self.cycle {
            config.cycle = Some(cycle.clone());
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(max_connections) = self.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(resolution) = self.resolution {
            config.source.resolution = resolution;
        }
        if let Some(step) = self.grid_step {
            config.grid_step = Some(step);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml(path)?,
        None => RunConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let cycle = match &config.cycle {
        Some(text) => text
            .parse::<ModelCycle>()
            .with_context(|| format!("Invalid cycle '{}'", text))?,
        None => ModelCycle::latest_before(Utc::now() - Duration::hours(PUBLICATION_LAG_HOURS)),
    };

    info!(
        cycle = %cycle,
        resolution = %config.source.resolution,
        forecast_hours = ?config.forecast_hours.hours(),
        max_connections = config.max_connections,
        "Starting GFS loader"
    );

    let store = Arc::new(
        PostgresStore::connect(&args.database_url, args.db_connections)
            .await
            .context("Failed to connect to database")?,
    );
    store.migrate().await.context("Failed to apply schema")?;

    let grid = GridSpec::new(config.grid_step())?;
    match store.init_grid(&grid).await.context("Grid initialization failed")? {
        GridInit::AlreadyComplete { cells } => info!(cells = cells, "Grid already initialized"),
        GridInit::Populated { cells } => info!(cells = cells, "Grid populated"),
    }

    let fetcher = Arc::new(RangeFetcher::new(
        config.max_connections,
        config.request_timeout(),
    )?);
    let pipeline = Pipeline::new(
        fetcher,
        Arc::new(GribCrateDecoder::new()),
        config.source.clone(),
        store,
        config.pipeline_config(),
    );

    let report = pipeline
        .run(cycle)
        .await
        .with_context(|| format!("Run for cycle {} failed", cycle))?;

    if !report.is_success() {
        error!(
            records = report.records,
            persisted = report.persisted,
            errors = %report.errors,
            "Load finished with failures"
        );
        bail!("{} failure(s) while loading cycle {}", report.errors.len(), cycle);
    }

    info!(
        records = report.records,
        persisted = report.persisted,
        "Load complete"
    );
    Ok(())
}
