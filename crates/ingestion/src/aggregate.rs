//! Per-cell merge of decoded layers.

use std::collections::HashMap;
use std::sync::Mutex;

use forecast_common::{AggregateRecord, CellKey, Parameter};

use crate::error::{IngestionError, Result};
use crate::field::ScalarField;

/// Concurrent map from (cell, forecast hour) to the values gathered so far.
///
/// Writers from different layers touch disjoint parameter slots of the same
/// record, so the final state does not depend on arrival order.
#[derive(Debug, Default)]
pub struct CellAggregator {
    records: Mutex<HashMap<CellKey, AggregateRecord>>,
}

impl CellAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &self,
        lat: f64,
        lng: f64,
        forecast_hour: u32,
        parameter: Parameter,
        value: f64,
    ) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| IngestionError::AggregationConflict)?;
        merge(&mut records, lat, lng, forecast_hour, parameter, value);
        Ok(())
    }

    /// Merge a whole field under a single lock acquisition.
    ///
    /// Missing points (NaN) are skipped. Returns the number of points merged.
    pub fn put_field(
        &self,
        field: &ScalarField,
        forecast_hour: u32,
        parameter: Parameter,
    ) -> Result<usize> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| IngestionError::AggregationConflict)?;

        let mut merged = 0;
        for (lat, lng, value) in field.points() {
            if value.is_nan() {
                continue;
            }
            merge(&mut records, lat, lng, forecast_hour, parameter, value);
            merged += 1;
        }
        Ok(merged)
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the aggregator once every producer has finished.
    ///
    /// Records come back ordered by key.
    pub fn into_records(self) -> Result<Vec<AggregateRecord>> {
        let records = self
            .records
            .into_inner()
            .map_err(|_| IngestionError::AggregationConflict)?;

        let mut records: Vec<AggregateRecord> = records.into_values().collect();
        records.sort_by_key(AggregateRecord::key);
        Ok(records)
    }
}

fn merge(
    records: &mut HashMap<CellKey, AggregateRecord>,
    lat: f64,
    lng: f64,
    forecast_hour: u32,
    parameter: Parameter,
    value: f64,
) {
    records
        .entry(CellKey::new(lat, lng, forecast_hour))
        .or_insert_with(|| AggregateRecord::new(lat, lng, forecast_hour))
        .values
        .set(parameter, value);
}
