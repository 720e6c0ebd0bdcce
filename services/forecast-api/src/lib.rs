//! Forecast API service library.
//!
//! Serves stored GFS observations for arbitrary paths and areas over time
//! windows.

pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Base path of the versioned API.
pub const API_BASE_PATH: &str = "/api/v1";

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("{}/bywkt", API_BASE_PATH),
            post(handlers::bywkt::bywkt_handler),
        )
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
