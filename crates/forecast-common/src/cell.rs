//! Grid cell identity.
//!
//! Cells are addressed by their center coordinate quantized to centidegrees.
//! The persistent id is the decimal concatenation of the signed latitude
//! and the six-digit zero-padded longitude, so `(-1.5, 12.25)` becomes
//! `-150001225`. The mapping is only injective for spacings that are a
//! whole number of centidegrees, which [`GridSpec::validate`] enforces.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{ForecastError, ForecastResult};

const LNG_DIGITS_FACTOR: i64 = 1_000_000;

/// Quantize a coordinate to integer centidegrees.
pub fn quantize(degrees: f64) -> i32 {
    (degrees * 100.0).round() as i32
}

fn normalize_lng(lng: f64) -> f64 {
    lng.rem_euclid(360.0)
}

/// Stable integer id of the cell centered at (lat, lng).
pub fn cell_id(lat: f64, lng: f64) -> i64 {
    let lat_c = quantize(lat) as i64;
    let lng_c = quantize(normalize_lng(lng)) as i64;

    if lat_c < 0 {
        -(-lat_c * LNG_DIGITS_FACTOR + lng_c)
    } else {
        lat_c * LNG_DIGITS_FACTOR + lng_c
    }
}

/// Composite key of one aggregated record: a cell at one forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub lat_centi: i32,
    pub lng_centi: i32,
    pub forecast_hour: u32,
}

impl CellKey {
    pub fn new(lat: f64, lng: f64, forecast_hour: u32) -> Self {
        Self {
            lat_centi: quantize(lat),
            lng_centi: quantize(normalize_lng(lng)),
            forecast_hour,
        }
    }

    /// Id of the grid cell this key belongs to.
    pub fn cell_id(&self) -> i64 {
        cell_id(self.lat_centi as f64 / 100.0, self.lng_centi as f64 / 100.0)
    }
}

/// A persistent grid cell with its bounding rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
    pub rect: BoundingBox,
}

/// Specification of the regular storage grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Spacing between cell centers in degrees.
    pub step: f64,
}

impl GridSpec {
    pub fn new(step: f64) -> ForecastResult<Self> {
        let spec = Self { step };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject spacings for which the centidegree cell id would collide.
    pub fn validate(&self) -> ForecastResult<()> {
        let invalid = |reason: &str| ForecastError::InvalidGridSpacing {
            step: self.step,
            reason: reason.to_string(),
        };

        if !self.step.is_finite() || self.step < 0.01 {
            return Err(invalid("must be at least 0.01 degree"));
        }
        if self.step > 90.0 {
            return Err(invalid("must not exceed 90 degrees"));
        }

        let centi = self.step * 100.0;
        if (centi - centi.round()).abs() > 1e-6 {
            return Err(invalid("must be a whole number of centidegrees"));
        }

        let per_circle = 360.0 / self.step;
        if (per_circle - per_circle.round()).abs() > 1e-6 {
            return Err(invalid("must divide 360 degrees evenly"));
        }

        Ok(())
    }

    /// Number of latitude rows, poles included.
    pub fn rows(&self) -> usize {
        (180.0 / self.step).round() as usize + 1
    }

    /// Number of longitude columns covering [0, 360).
    pub fn cols(&self) -> usize {
        (360.0 / self.step).round() as usize
    }

    pub fn cell_count(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Walk the grid south to north, west to east.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        let half = self.step / 2.0;
        (0..self.rows()).flat_map(move |row| {
            let lat = -90.0 + row as f64 * self.step;
            (0..self.cols()).map(move |col| {
                let lng = col as f64 * self.step;
                GridCell {
                    id: cell_id(lat, lng),
                    lat,
                    lng,
                    rect: BoundingBox::around(lng, lat, half),
                }
            })
        })
    }
}
