//! The fixed set of model layers extracted from every forecast file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// A tracked meteorological parameter, named after its GRIB2 short name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    /// Pressure reduced to mean sea level (Pa)
    Prmsl,
    /// Land cover mask (1 = land, 0 = sea)
    Land,
    /// Temperature (K)
    Tmp,
    /// U-component of wind (m/s)
    Ugrd,
    /// V-component of wind (m/s)
    Vgrd,
    /// Relative humidity (%)
    Rh,
    /// Categorical rain (0/1)
    Crain,
    /// Visibility (m)
    Vis,
}

impl Parameter {
    pub const ALL: [Parameter; 8] = [
        Parameter::Prmsl,
        Parameter::Land,
        Parameter::Tmp,
        Parameter::Ugrd,
        Parameter::Vgrd,
        Parameter::Rh,
        Parameter::Crain,
        Parameter::Vis,
    ];

    /// GRIB2 short name as it appears in the offset catalog.
    pub fn short_name(&self) -> &'static str {
        match self {
            Parameter::Prmsl => "PRMSL",
            Parameter::Land => "LAND",
            Parameter::Tmp => "TMP",
            Parameter::Ugrd => "UGRD",
            Parameter::Vgrd => "VGRD",
            Parameter::Rh => "RH",
            Parameter::Crain => "CRAIN",
            Parameter::Vis => "VIS",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Parameter {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ForecastError::UnknownParameter(s.to_string()))
    }
}

/// A (parameter, vertical level) pair to pull out of a forecast file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerRequest {
    pub parameter: Parameter,
    /// Level label exactly as written in the offset catalog.
    pub layer: &'static str,
}

impl LayerRequest {
    pub const fn new(parameter: Parameter, layer: &'static str) -> Self {
        Self { parameter, layer }
    }

    /// File-name friendly identifier, e.g. `TMP_2_m_above_ground`.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            self.parameter.short_name(),
            self.layer.replace([' ', '/'], "_")
        )
    }
}

impl fmt::Display for LayerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parameter, self.layer)
    }
}

/// Layers extracted for every forecast hour.
pub const LAYER_CATALOG: [LayerRequest; 8] = [
    LayerRequest::new(Parameter::Prmsl, "mean sea level"),
    LayerRequest::new(Parameter::Land, "surface"),
    LayerRequest::new(Parameter::Tmp, "2 m above ground"),
    LayerRequest::new(Parameter::Ugrd, "10 m above ground"),
    LayerRequest::new(Parameter::Vgrd, "10 m above ground"),
    LayerRequest::new(Parameter::Rh, "2 m above ground"),
    LayerRequest::new(Parameter::Crain, "surface"),
    LayerRequest::new(Parameter::Vis, "surface"),
];
