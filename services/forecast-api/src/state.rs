//! Application state for the forecast API.

use std::sync::Arc;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{PostgresStore, SegmentSource};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Answers segment queries.
    pub forecasts: Arc<dyn SegmentSource>,

    /// Renders `/metrics`; absent when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(forecasts: Arc<dyn SegmentSource>) -> Self {
        Self {
            forecasts,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Connect to the observation database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let store = PostgresStore::connect(database_url, max_connections).await?;
        Ok(Self::new(Arc::new(store)))
    }
}
