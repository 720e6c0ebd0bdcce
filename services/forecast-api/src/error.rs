//! API error type and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use forecast_common::ForecastError;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

/// Body of every 400 response.
pub const BAD_REQUEST_BODY: &str = "Bad request";

/// Body of every 500 response; internal detail stays in the logs.
pub const INTERNAL_ERROR_BODY: &str = "Some error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Invalid(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::BadRequest(reason) => {
                warn!(reason = %reason, "Rejected request");
                BAD_REQUEST_BODY
            }
            ApiError::Internal(reason) => {
                error!(reason = %reason, "Request failed");
                INTERNAL_ERROR_BODY
            }
        };
        (self.status_code(), Json(body)).into_response()
    }
}
