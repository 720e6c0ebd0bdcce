//! `POST /api/v1/bywkt`: forecast values along paths and inside areas.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use forecast_common::QuerySegment;
use metrics::counter;
use storage::group_by_shape;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::models::{ForecastResponse, WktRequestBody};
use crate::state::AppState;

/// Query every shape of the request and group the rows per clipped cell.
///
/// Timestamps are rounded to the model cadence before querying. Shapes that
/// hit no stored cell simply contribute nothing to the response.
#[instrument(skip(state, payload))]
pub async fn bywkt_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<WktRequestBody>, JsonRejection>,
) -> Result<Json<Vec<ForecastResponse>>, ApiError> {
    counter!("forecast_api_requests_total", "endpoint" => "bywkt").increment(1);

    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let segments = body
        .shapes
        .iter()
        .map(|shape| {
            let segment = shape.to_segment();
            segment.validate()?;
            Ok(segment)
        })
        .collect::<Result<Vec<QuerySegment>, ApiError>>()?;

    if segments.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let rows = state.forecasts.forecast_by_segments(&segments).await?;
    debug!(segments = segments.len(), rows = rows.len(), "Segments queried");

    let response = group_by_shape(rows)
        .into_iter()
        .map(|series| ForecastResponse::from_series(series, &body))
        .collect();

    Ok(Json(response))
}
