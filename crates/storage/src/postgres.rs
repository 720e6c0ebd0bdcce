//! PostgreSQL/PostGIS persistence for the forecast grid and observations.

use async_trait::async_trait;
use forecast_common::{GridCell, GridSpec, Observation, QuerySegment};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument, warn};

use crate::error::{StorageError, StorageResult};
use crate::query::{ForecastRow, SegmentQuery};
use crate::traits::{ObservationStore, SegmentSource, MAX_BATCH_SIZE};

/// Outcome of [`PostgresStore::init_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridInit {
    /// Every cell was already present.
    AlreadyComplete { cells: usize },
    /// The grid was (re)built from scratch.
    Populated { cells: usize },
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the extension and tables if missing.
    pub async fn migrate(&self) -> StorageResult<()> {
        for script in SCHEMA {
            self.execute_script(script, "Migration").await?;
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str, what: &str) -> StorageResult<()> {
        for statement in statements(script) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Database(format!("{} failed: {}", what, e)))?;
        }
        Ok(())
    }

    /// Populate the grid table unless it already holds every cell of `spec`.
    ///
    /// Cells are written in batches of [`MAX_BATCH_SIZE`], each in its own
    /// transaction. On any failure the grid table is dropped so the next run
    /// starts over.
    #[instrument(skip(self), fields(step = spec.step))]
    pub async fn init_grid(&self, spec: &GridSpec) -> StorageResult<GridInit> {
        spec.validate()?;
        let expected = spec.cell_count();

        self.execute_script(GRID_SQL, "Create grid").await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM grid")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

        if existing as usize == expected {
            info!(cells = expected, "Grid already initialized");
            return Ok(GridInit::AlreadyComplete { cells: expected });
        }

        match self.populate_grid(spec, existing).await {
            Ok(()) => {
                info!(cells = expected, "Grid initialized");
                Ok(GridInit::Populated { cells: expected })
            }
            Err(e) => {
                warn!(error = %e, "Grid initialization failed, dropping grid table");
                if let Err(drop_err) = sqlx::query("DROP TABLE IF EXISTS grid")
                    .execute(&self.pool)
                    .await
                {
                    warn!(error = %drop_err, "Failed to drop grid table");
                }
                Err(e)
            }
        }
    }

    async fn populate_grid(&self, spec: &GridSpec, existing: i64) -> StorageResult<()> {
        if existing > 0 {
            warn!(existing = existing, "Grid is incomplete, rebuilding");
            sqlx::query("TRUNCATE grid")
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Database(format!("Truncate failed: {}", e)))?;
        }

        let mut batch: Vec<GridCell> = Vec::with_capacity(MAX_BATCH_SIZE);
        let mut written = 0usize;
        for cell in spec.cells() {
            batch.push(cell);
            if batch.len() == MAX_BATCH_SIZE {
                self.write_grid_batch(&batch).await?;
                written += batch.len();
                batch.clear();
                if written % 100_000 == 0 {
                    info!(written = written, total = spec.cell_count(), "Grid progress");
                }
            }
        }
        if !batch.is_empty() {
            self.write_grid_batch(&batch).await?;
        }
        Ok(())
    }

    async fn write_grid_batch(&self, cells: &[GridCell]) -> StorageResult<()> {
        let mut tx = self.begin_repeatable_read().await?;
        build_grid_insert(cells)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Database(format!("Grid insert failed: {}", e)))?;
        tx.commit()
            .await
            .map_err(|e| StorageError::Database(format!("Commit failed: {}", e)))
    }

    async fn begin_repeatable_read(&self) -> StorageResult<sqlx::Transaction<'_, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Database(format!("Begin failed: {}", e)))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Database(format!("Set isolation failed: {}", e)))?;
        Ok(tx)
    }
}

#[async_trait]
impl ObservationStore for PostgresStore {
    async fn write_observations(&self, batch: &[Observation]) -> StorageResult<u64> {
        check_batch_size(batch.len())?;
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.begin_repeatable_read().await?;
        let result = build_observation_upsert(batch)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Database(format!("Upsert failed: {}", e)))?;
        tx.commit()
            .await
            .map_err(|e| StorageError::Database(format!("Commit failed: {}", e)))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SegmentSource for PostgresStore {
    async fn forecast_by_segments(
        &self,
        segments: &[QuerySegment],
    ) -> StorageResult<Vec<ForecastRow>> {
        let Some(built) = SegmentQuery::build(segments) else {
            return Ok(Vec::new());
        };

        let mut query = sqlx::query_as::<_, ForecastRow>(&built.sql);
        for bind in &built.binds {
            query = query.bind(bind.from).bind(bind.to).bind(bind.wkt.as_str());
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
    }
}

fn check_batch_size(size: usize) -> StorageResult<()> {
    if size > MAX_BATCH_SIZE {
        return Err(StorageError::BatchSizeExceeded {
            size,
            max: MAX_BATCH_SIZE,
        });
    }
    Ok(())
}

fn build_grid_insert(cells: &[GridCell]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("INSERT INTO grid (id, geometry) ");
    builder.push_values(cells, |mut row, cell| {
        row.push_bind(cell.id)
            .push("ST_GeomFromText(")
            .push_bind_unseparated(cell.rect.to_wkt())
            .push_unseparated(", 4326)");
    });
    builder.push(" ON CONFLICT (id) DO NOTHING");
    builder
}

/// Insert or overwrite every measurement column; the key never changes.
fn build_observation_upsert(batch: &[Observation]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO observations (cell_id, date_time, is_ground, pressure, temperature, \
         u_wind, v_wind, c_rain, r_humidity, visibility) ",
    );
    builder.push_values(batch, |mut row, obs| {
        row.push_bind(obs.cell_id)
            .push_bind(obs.date_time)
            .push_bind(obs.is_ground)
            .push_bind(obs.pressure)
            .push_bind(obs.temperature)
            .push_bind(obs.u_wind)
            .push_bind(obs.v_wind)
            .push_bind(obs.c_rain)
            .push_bind(obs.r_humidity)
            .push_bind(obs.visibility);
    });
    builder.push(
        " ON CONFLICT (cell_id, date_time) DO UPDATE SET \
         is_ground = EXCLUDED.is_ground, \
         pressure = EXCLUDED.pressure, \
         temperature = EXCLUDED.temperature, \
         u_wind = EXCLUDED.u_wind, \
         v_wind = EXCLUDED.v_wind, \
         c_rain = EXCLUDED.c_rain, \
         r_humidity = EXCLUDED.r_humidity, \
         visibility = EXCLUDED.visibility",
    );
    builder
}

fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}

const EXTENSION_SQL: &str = "CREATE EXTENSION IF NOT EXISTS postgis";

/// Grid table and its spatial index; also rerun by `init_grid` after a drop.
const GRID_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS grid (
    id BIGINT PRIMARY KEY,
    geometry geometry(POLYGON, 4326) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_grid_geometry ON grid USING GIST (geometry);
"#;

const OBSERVATIONS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS observations (
    id BIGSERIAL PRIMARY KEY,
    cell_id BIGINT NOT NULL,
    date_time TIMESTAMPTZ NOT NULL,
    is_ground BOOLEAN,
    pressure REAL,
    temperature REAL,
    u_wind REAL,
    v_wind REAL,
    c_rain REAL,
    r_humidity REAL,
    visibility REAL,

    UNIQUE(cell_id, date_time)
);

CREATE INDEX IF NOT EXISTS idx_observations_date_time ON observations(date_time);
"#;

const SCHEMA: [&str; 3] = [EXTENSION_SQL, GRID_SQL, OBSERVATIONS_SQL];
