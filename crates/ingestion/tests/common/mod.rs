//! Shared fixtures: an in-process stand-in for the NOMADS file server, a
//! text-based fake decoder and an in-memory observation store.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use forecast_common::{Observation, LAYER_CATALOG};
use grib_decoder::{DecodeError, DecodeResult, DecodedMessage, GridDecoder, GridDefinition, LatLonGrid};
use storage::{ObservationStore, StorageError, StorageResult};

/// Bytes reserved for each message in the synthetic forecast file.
pub const SLOT: usize = 100;

pub const GRIB_PATH: &str = "/gfs.20240929/00/atmos/gfs.t00z.pgrb2.0p50.f000";

/// Forecast hours the test server answers for; every hour serves the same file.
pub const SERVED_HOURS: [u32; 3] = [0, 3, 6];

pub fn grib_path(forecast_hour: u32) -> String {
    format!("/gfs.20240929/00/atmos/gfs.t00z.pgrb2.0p50.f{:03}", forecast_hour)
}

/// Synthetic forecast file: one fixed-size slot per catalog layer, each
/// starting with the parameter short name.
pub fn forecast_file() -> Vec<u8> {
    let mut data = Vec::with_capacity(SLOT * LAYER_CATALOG.len());
    for layer in LAYER_CATALOG.iter() {
        let mut slot = layer.parameter.short_name().as_bytes().to_vec();
        slot.resize(SLOT, b' ');
        data.extend_from_slice(&slot);
    }
    data
}

/// `.idx` text matching [`forecast_file`].
pub fn forecast_index() -> String {
    forecast_index_without(&[])
}

/// `.idx` text matching [`forecast_file`] with the lines of `skipped` parameters left out.
pub fn forecast_index_without(skipped: &[&str]) -> String {
    LAYER_CATALOG
        .iter()
        .enumerate()
        .filter(|(_, layer)| !skipped.contains(&layer.parameter.short_name()))
        .map(|(i, layer)| {
            format!(
                "{}:{}:d=2024092900:{}:{}:anl:\n",
                i + 1,
                i * SLOT,
                layer.parameter.short_name(),
                layer.layer
            )
        })
        .collect()
}

#[derive(Default)]
pub struct ServerState {
    pub data: Vec<u8>,
    pub index: Option<String>,
    /// Parameters whose slot is served; anything else answers 404.
    pub allowed: Option<HashSet<String>>,
    pub delay: Duration,
    pub ranges_seen: Mutex<Vec<Option<String>>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ServerState {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn ranges(&self) -> Vec<Option<String>> {
        self.ranges_seen.lock().unwrap().clone()
    }
}

fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let spec = value.strip_prefix("bytes=")?;
    let (from, to) = spec.split_once('-')?;
    let from: usize = from.parse().ok()?;
    let to: usize = if to.is_empty() {
        len - 1
    } else {
        to.parse().ok()?
    };
    Some((from, to.min(len - 1)))
}

async fn serve_grib(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.ranges_seen.lock().unwrap().push(range.clone());

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let response = match range {
        None => (StatusCode::OK, state.data.clone()).into_response(),
        Some(value) => match parse_range(&value, state.data.len()) {
            Some((from, to)) => {
                let slice = &state.data[from..=to];
                let name = String::from_utf8_lossy(slice)
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let permitted = state
                    .allowed
                    .as_ref()
                    .map(|allowed| allowed.contains(&name))
                    .unwrap_or(true);
                if permitted {
                    Response::builder()
                        .status(StatusCode::PARTIAL_CONTENT)
                        .body(Body::from(slice.to_vec()))
                        .unwrap()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }
            None => StatusCode::RANGE_NOT_SATISFIABLE.into_response(),
        },
    };

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

async fn serve_index(State(state): State<Arc<ServerState>>) -> Response {
    match &state.index {
        Some(text) => (StatusCode::OK, text.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the server and return its base URL.
pub async fn spawn_server(state: Arc<ServerState>) -> String {
    let mut app = Router::new();
    for hour in SERVED_HOURS {
        let path = grib_path(hour);
        app = app
            .route(&path, get(serve_grib))
            .route(&format!("{}.idx", path), get(serve_index));
    }
    let app = app.with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Reads the parameter name at the start of the payload and returns a 2x2
/// half-degree grid at the north-west corner filled with a per-parameter value.
#[derive(Default)]
pub struct TextDecoder {
    /// Number of messages returned per parameter; one when absent.
    pub message_counts: HashMap<&'static str, usize>,
}

impl TextDecoder {
    pub fn with_message_counts(counts: &[(&'static str, usize)]) -> Self {
        Self {
            message_counts: counts.iter().copied().collect(),
        }
    }
}

pub fn value_for(parameter: &str) -> Option<f32> {
    match parameter {
        "PRMSL" => Some(101325.0),
        "LAND" => Some(1.0),
        "TMP" => Some(280.0),
        "UGRD" => Some(3.0),
        "VGRD" => Some(-4.0),
        "RH" => Some(65.0),
        "CRAIN" => Some(0.0),
        "VIS" => Some(24000.0),
        _ => None,
    }
}

impl GridDecoder for TextDecoder {
    fn decode(&self, data: &[u8]) -> DecodeResult<Vec<DecodedMessage>> {
        let text = String::from_utf8_lossy(data);
        let name = text.split_whitespace().next().unwrap_or_default();
        let value = value_for(name)
            .ok_or_else(|| DecodeError::InvalidFormat(format!("unknown payload '{}'", name)))?;

        let message = DecodedMessage {
            grid: GridDefinition::LatLon(LatLonGrid {
                ni: 2,
                nj: 2,
                la1: 90_000_000,
                lo1: 0,
                la2: 89_500_000,
                lo2: 500_000,
                di: 500_000,
                dj: 500_000,
                scanning_mode: 0,
            }),
            values: vec![value; 4],
        };
        let count = self.message_counts.get(name).copied().unwrap_or(1);
        Ok(vec![message; count])
    }
}

/// Keeps written observations; optionally fails one batch.
#[derive(Default)]
pub struct MemoryStore {
    pub written: Mutex<Vec<Observation>>,
    pub batches: AtomicUsize,
    pub fail_batch: Option<usize>,
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn write_observations(&self, batch: &[Observation]) -> StorageResult<u64> {
        let n = self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_batch == Some(n) {
            return Err(StorageError::Database("simulated serialization failure".to_string()));
        }
        self.written.lock().unwrap().extend_from_slice(batch);
        Ok(batch.len() as u64)
    }
}
