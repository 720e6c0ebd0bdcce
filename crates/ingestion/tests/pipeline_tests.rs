//! End-to-end runs against the local file server, a fake decoder and an
//! in-memory store.

mod common;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::{
    forecast_file, forecast_index, forecast_index_without, spawn_server, MemoryStore, ServerState,
    TextDecoder, SERVED_HOURS,
};
use forecast_common::{ModelCycle, Parameter, LAYER_CATALOG};
use grib_decoder::DecodeError;
use ingestion::{
    layer_path, DownloadError, IndexError, IngestionError, NoaaSource, Pipeline, PipelineConfig,
    RangeFetcher, RunReport,
};

fn cycle() -> ModelCycle {
    "20240929/00".parse().unwrap()
}

fn pipeline(base_url: String, store: Arc<MemoryStore>, work_dir: &Path, batch_size: usize) -> Pipeline {
    let config = PipelineConfig {
        forecast_hours: vec![0],
        batch_size,
        work_dir: work_dir.to_path_buf(),
    };
    pipeline_with(base_url, store, config, 3, TextDecoder::default())
}

fn pipeline_with(
    base_url: String,
    store: Arc<MemoryStore>,
    config: PipelineConfig,
    max_connections: usize,
    decoder: TextDecoder,
) -> Pipeline {
    let fetcher = Arc::new(RangeFetcher::new(max_connections, Duration::from_secs(10)).unwrap());
    let source = NoaaSource {
        base_url,
        ..Default::default()
    };
    Pipeline::new(fetcher, Arc::new(decoder), source, store, config)
}

/// The single forecast hour's layer failures, as `(parameter, error)` pairs.
fn layer_failures(report: &RunReport) -> Vec<(Parameter, &IngestionError)> {
    assert_eq!(report.errors.len(), 1);
    match &report.errors.errors[0] {
        IngestionError::Layers(layers) => {
            assert_eq!(layers.forecast_hour, 0);
            layers
                .failures
                .iter()
                .map(|(layer, e)| (layer.parameter, e))
                .collect()
        }
        other => panic!("expected layer failures, got {other:?}"),
    }
}

#[tokio::test]
async fn test_full_run_persists_every_parameter() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index()),
        ..Default::default()
    });
    let base = spawn_server(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let report = pipeline(base, store.clone(), dir.path(), 100)
        .run(cycle())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.records, 4);
    assert_eq!(report.persisted, 4);

    // Eight ranged requests, one per layer; the index is fetched separately.
    assert_eq!(state.ranges().len(), LAYER_CATALOG.len());

    let written = store.written.lock().unwrap();
    let expected_time = Utc.with_ymd_and_hms(2024, 9, 29, 0, 0, 0).unwrap();
    for obs in written.iter() {
        assert_eq!(obs.date_time, expected_time);
        assert_eq!(obs.is_ground, Some(true));
        assert_eq!(obs.pressure, Some(101325.0));
        assert_eq!(obs.temperature, Some(280.0));
        assert_eq!(obs.u_wind, Some(3.0));
        assert_eq!(obs.v_wind, Some(-4.0));
        assert_eq!(obs.r_humidity, Some(65.0));
        assert_eq!(obs.c_rain, Some(0.0));
        assert_eq!(obs.visibility, Some(24000.0));
    }
    let cells: HashSet<i64> = written.iter().map(|o| o.cell_id).collect();
    assert_eq!(cells.len(), 4);
}

#[tokio::test]
async fn test_failed_layers_are_reported_and_the_rest_persisted() {
    let allowed: HashSet<String> = ["LAND", "TMP"].iter().map(|s| s.to_string()).collect();
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index()),
        allowed: Some(allowed),
        ..Default::default()
    });
    let base = spawn_server(state).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let report = pipeline(base, store.clone(), dir.path(), 100)
        .run(cycle())
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.errors.len(), 1);
    match &report.errors.errors[0] {
        IngestionError::Layers(layers) => {
            assert_eq!(layers.forecast_hour, 0);
            assert_eq!(layers.len(), 6);
            assert!(layers
                .failures
                .iter()
                .all(|(_, e)| matches!(e, IngestionError::Download(DownloadError::Status { status: 404, .. }))));
        }
        other => panic!("expected layer failures, got {other:?}"),
    }

    assert_eq!(report.persisted, 4);
    let written = store.written.lock().unwrap();
    for obs in written.iter() {
        assert_eq!(obs.is_ground, Some(true));
        assert_eq!(obs.temperature, Some(280.0));
        assert_eq!(obs.pressure, None);
        assert_eq!(obs.visibility, None);
    }
}

#[tokio::test]
async fn test_cached_files_skip_network() {
    let dir = tempfile::tempdir().unwrap();
    let cycle = cycle();
    let source = NoaaSource::default();

    let idx = dir
        .path()
        .join(format!("{}_{}.idx", cycle.date_stamp(), source.file_name(&cycle, 0)));
    tokio::fs::write(&idx, forecast_index()).await.unwrap();
    for layer in LAYER_CATALOG.iter() {
        let path = layer_path(dir.path(), &cycle, 0, layer);
        tokio::fs::write(&path, layer.parameter.short_name()).await.unwrap();
    }

    // Nothing listens here; any download attempt would fail.
    let store = Arc::new(MemoryStore::default());
    let report = pipeline("http://127.0.0.1:9".to_string(), store.clone(), dir.path(), 100)
        .run(cycle)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.persisted, 4);
}

#[tokio::test]
async fn test_missing_index_fails_the_run() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: None,
        ..Default::default()
    });
    let base = spawn_server(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let err = pipeline(base, store.clone(), dir.path(), 100)
        .run(cycle())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestionError::Download(DownloadError::Status { status: 404, .. })
    ));
    assert!(state.ranges().is_empty());
    assert!(store.written.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_write_failure_keeps_committed_batches() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index()),
        ..Default::default()
    });
    let base = spawn_server(state).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore {
        fail_batch: Some(1),
        ..Default::default()
    });

    let report = pipeline(base, store.clone(), dir.path(), 1)
        .run(cycle())
        .await
        .unwrap();

    assert_eq!(report.records, 4);
    assert_eq!(report.persisted, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors.errors[0], IngestionError::Storage(_)));

    // Writing stops at the failed batch.
    assert_eq!(store.batches.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(store.written.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wrong_message_count_fails_only_that_layer() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index()),
        ..Default::default()
    });
    let base = spawn_server(state).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let config = PipelineConfig {
        forecast_hours: vec![0],
        batch_size: 100,
        work_dir: dir.path().to_path_buf(),
    };
    let decoder = TextDecoder::with_message_counts(&[("RH", 0), ("CRAIN", 2)]);

    let report = pipeline_with(base, store.clone(), config, 3, decoder)
        .run(cycle())
        .await
        .unwrap();

    let failures = layer_failures(&report);
    assert_eq!(failures.len(), 2);
    for (parameter, error) in failures {
        let found = match parameter {
            Parameter::Rh => 0,
            Parameter::Crain => 2,
            other => panic!("unexpected failed layer {other}"),
        };
        assert!(matches!(
            error,
            IngestionError::Decode(DecodeError::MessageCount { expected: 1, found: f }) if *f == found
        ));
    }

    assert_eq!(report.persisted, 4);
    let written = store.written.lock().unwrap();
    for obs in written.iter() {
        assert_eq!(obs.r_humidity, None);
        assert_eq!(obs.c_rain, None);
        assert_eq!(obs.temperature, Some(280.0));
        assert_eq!(obs.pressure, Some(101325.0));
        assert_eq!(obs.visibility, Some(24000.0));
    }
}

#[tokio::test]
async fn test_layer_missing_from_index_fails_alone() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index_without(&["VIS"])),
        ..Default::default()
    });
    let base = spawn_server(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let report = pipeline(base, store.clone(), dir.path(), 100)
        .run(cycle())
        .await
        .unwrap();

    let failures = layer_failures(&report);
    assert_eq!(failures.len(), 1);
    let (parameter, error) = &failures[0];
    assert_eq!(*parameter, Parameter::Vis);
    assert!(matches!(
        error,
        IngestionError::Index(IndexError::OffsetNotFound { parameter, layer })
            if parameter == "VIS" && layer == "surface"
    ));

    // No request goes out for the unindexed layer.
    assert_eq!(state.ranges().len(), LAYER_CATALOG.len() - 1);

    assert_eq!(report.persisted, 4);
    let written = store.written.lock().unwrap();
    for obs in written.iter() {
        assert_eq!(obs.visibility, None);
        assert_eq!(obs.is_ground, Some(true));
        assert_eq!(obs.u_wind, Some(3.0));
        assert_eq!(obs.c_rain, Some(0.0));
    }
}

#[tokio::test]
async fn test_forecast_hours_share_the_download_gate() {
    let state = Arc::new(ServerState {
        data: forecast_file(),
        index: Some(forecast_index()),
        delay: Duration::from_millis(20),
        ..Default::default()
    });
    let base = spawn_server(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let config = PipelineConfig {
        forecast_hours: SERVED_HOURS.to_vec(),
        batch_size: 5,
        work_dir: dir.path().to_path_buf(),
    };

    let report = pipeline_with(base, store.clone(), config, 2, TextDecoder::default())
        .run(cycle())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.records, 12);
    assert_eq!(report.persisted, 12);
    assert_eq!(state.ranges().len(), SERVED_HOURS.len() * LAYER_CATALOG.len());
    assert!(state.max_in_flight() <= 2, "max in flight {}", state.max_in_flight());

    let written = store.written.lock().unwrap();
    let times: HashSet<DateTime<Utc>> = written.iter().map(|o| o.date_time).collect();
    let expected: HashSet<DateTime<Utc>> = [0, 3, 6]
        .iter()
        .map(|h| Utc.with_ymd_and_hms(2024, 9, 29, *h, 0, 0).unwrap())
        .collect();
    assert_eq!(times, expected);
}
