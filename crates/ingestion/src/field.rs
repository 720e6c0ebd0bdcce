//! Decoded scalar fields on a regular lat/lon grid.

use grib_decoder::{DecodeError, DecodedMessage, GridDefinition};

/// Placement of a regular grid.
///
/// Point `(row, col)` sits at `origin_lat - row * lat_step`,
/// `origin_lng + col * lng_step`; a negative `lat_step` means rows run
/// northward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub lat_step: f64,
    pub lng_step: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridGeometry {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the point at a row-major index.
    pub fn point(&self, index: usize) -> (f64, f64) {
        let row = index / self.cols;
        let col = index % self.cols;
        (
            self.origin_lat - row as f64 * self.lat_step,
            self.origin_lng + col as f64 * self.lng_step,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub values: Vec<f64>,
    pub geometry: GridGeometry,
}

impl ScalarField {
    /// Iterate `(lat, lng, value)` in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.values.iter().enumerate().map(move |(i, v)| {
            let (lat, lng) = self.geometry.point(i);
            (lat, lng, *v)
        })
    }
}

impl TryFrom<DecodedMessage> for ScalarField {
    type Error = DecodeError;

    fn try_from(message: DecodedMessage) -> Result<Self, Self::Error> {
        let latlon = match message.grid {
            GridDefinition::LatLon(latlon) => latlon,
            GridDefinition::Other { template } => {
                return Err(DecodeError::UnsupportedGrid { template })
            }
        };

        let geometry = GridGeometry {
            origin_lat: latlon.first_lat(),
            origin_lng: latlon.first_lng(),
            lat_step: if latlon.scans_northward() {
                -latlon.lat_step()
            } else {
                latlon.lat_step()
            },
            lng_step: latlon.lng_step(),
            rows: latlon.nj as usize,
            cols: latlon.ni as usize,
        };

        if message.values.len() != geometry.len() {
            return Err(DecodeError::ValueCount {
                expected: geometry.len(),
                found: message.values.len(),
            });
        }

        Ok(Self {
            values: message.values.into_iter().map(f64::from).collect(),
            geometry,
        })
    }
}
