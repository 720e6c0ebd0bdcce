//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box of `half_extent` degrees in every direction around a center point.
    pub fn around(lng: f64, lat: f64, half_extent: f64) -> Self {
        Self::new(
            lng - half_extent,
            lat - half_extent,
            lng + half_extent,
            lat + half_extent,
        )
    }

    /// Closed WKT ring, counter-clockwise starting at the south-west corner.
    pub fn to_wkt(&self) -> String {
        format!(
            "POLYGON(({x1} {y1}, {x2} {y1}, {x2} {y2}, {x1} {y2}, {x1} {y1}))",
            x1 = self.min_x,
            y1 = self.min_y,
            x2 = self.max_x,
            y2 = self.max_y,
        )
    }
}
