//! Multi-segment spatial query construction and result reshaping.
//!
//! A request is a list of `(geometry, time window)` segments. All segments
//! go into a single statement: the grid is intersected with each geometry,
//! every hit is clipped to it, and observations of the hit cells inside the
//! segment's window are returned, keyed by the clipped geometry's WKT.

use chrono::{DateTime, Utc};
use forecast_common::QuerySegment;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subtracted from stored temperatures to report Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Parameters bound for one segment, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBind {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub wkt: String,
}

/// A built statement plus its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentQuery {
    pub sql: String,
    pub binds: Vec<SegmentBind>,
}

impl SegmentQuery {
    /// Build the statement, or `None` when there is nothing to ask for.
    pub fn build(segments: &[QuerySegment]) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }

        let values = (0..segments.len())
            .map(|i| {
                let base = i * 3;
                format!(
                    "(${}::timestamptz, ${}::timestamptz, ST_GeomFromText(${}, 4326))",
                    base + 1,
                    base + 2,
                    base + 3
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "WITH q(f, t, geo) AS (VALUES {values}), \
             cells AS ( \
                SELECT g.id AS cell_id, q.f, q.t, ST_Intersection(g.geometry, q.geo) AS clip \
                FROM grid g JOIN q ON ST_Intersects(g.geometry, q.geo) \
             ) \
             SELECT ST_AsText(c.clip) AS shape, \
                (o.temperature - {kelvin})::float8 AS temperature, \
                o.pressure::float8 AS pressure, \
                o.c_rain::float8 AS c_rain, \
                o.r_humidity::float8 AS r_humidity, \
                o.u_wind::float8 AS u_wind, \
                o.v_wind::float8 AS v_wind, \
                o.date_time \
             FROM observations o \
             JOIN cells c ON c.cell_id = o.cell_id AND o.date_time BETWEEN c.f AND c.t \
             ORDER BY o.date_time",
            values = values,
            kelvin = KELVIN_OFFSET,
        );

        let binds = segments
            .iter()
            .map(|s| SegmentBind {
                from: s.from,
                to: s.until(),
                wkt: s.wkt.clone(),
            })
            .collect();

        Some(Self { sql, binds })
    }
}

/// One observation row returned by a segment query.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ForecastRow {
    /// WKT of the cell clipped to the requested geometry.
    pub shape: String,
    /// Celsius
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub c_rain: Option<f64>,
    pub r_humidity: Option<f64>,
    pub u_wind: Option<f64>,
    pub v_wind: Option<f64>,
    pub date_time: DateTime<Utc>,
}

/// All rows of one clipped geometry, ordered by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSeries {
    pub shape: String,
    pub rows: Vec<ForecastRow>,
}

/// Group rows by clipped geometry.
///
/// Groups keep the order in which their shape first appears; rows inside a
/// group are sorted by time (stable for equal timestamps).
pub fn group_by_shape(rows: Vec<ForecastRow>) -> Vec<ShapeSeries> {
    let mut series: Vec<ShapeSeries> = Vec::new();
    let mut positions: std::collections::HashMap<String, usize> = Default::default();

    for row in rows {
        match positions.get(&row.shape) {
            Some(&i) => series[i].rows.push(row),
            None => {
                positions.insert(row.shape.clone(), series.len());
                series.push(ShapeSeries {
                    shape: row.shape.clone(),
                    rows: vec![row],
                });
            }
        }
    }

    for s in &mut series {
        s.rows.sort_by_key(|r| r.date_time);
    }
    series
}
