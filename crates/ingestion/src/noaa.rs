//! NOMADS GFS file naming.

use std::fmt;
use std::str::FromStr;

use forecast_common::ModelCycle;
use serde::{Deserialize, Serialize};

pub const NOMADS_BASE_URL: &str = "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod";

/// GFS product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Atmos,
    Wave,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Atmos => "atmos",
            ModelKind::Wave => "wave",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atmos" => Ok(ModelKind::Atmos),
            "wave" => Ok(ModelKind::Wave),
            other => Err(format!("unknown model '{}', expected atmos or wave", other)),
        }
    }
}

/// Horizontal resolution of the published grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridResolution {
    #[serde(rename = "0p25")]
    Quarter,
    #[default]
    #[serde(rename = "0p50")]
    Half,
    #[serde(rename = "1p00")]
    One,
}

impl GridResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridResolution::Quarter => "0p25",
            GridResolution::Half => "0p50",
            GridResolution::One => "1p00",
        }
    }

    pub fn degrees(&self) -> f64 {
        match self {
            GridResolution::Quarter => 0.25,
            GridResolution::Half => 0.5,
            GridResolution::One => 1.0,
        }
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0p25" => Ok(GridResolution::Quarter),
            "0p50" => Ok(GridResolution::Half),
            "1p00" => Ok(GridResolution::One),
            other => Err(format!(
                "unknown resolution '{}', expected 0p25, 0p50 or 1p00",
                other
            )),
        }
    }
}

/// Where to find GFS files for a cycle and forecast hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoaaSource {
    pub base_url: String,
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default)]
    pub resolution: GridResolution,
}

impl Default for NoaaSource {
    fn default() -> Self {
        Self {
            base_url: NOMADS_BASE_URL.to_string(),
            model: ModelKind::default(),
            resolution: GridResolution::default(),
        }
    }
}

impl NoaaSource {
    /// Bare file name, e.g. `gfs.t06z.pgrb2.0p50.f003`.
    pub fn file_name(&self, cycle: &ModelCycle, forecast_hour: u32) -> String {
        format!(
            "gfs.t{}z.pgrb2.{}.f{:03}",
            cycle.hour_stamp(),
            self.resolution,
            forecast_hour
        )
    }

    pub fn grib_url(&self, cycle: &ModelCycle, forecast_hour: u32) -> String {
        format!(
            "{}/gfs.{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            cycle.date_stamp(),
            cycle.hour_stamp(),
            self.model.as_str(),
            self.file_name(cycle, forecast_hour)
        )
    }

    pub fn index_url(&self, cycle: &ModelCycle, forecast_hour: u32) -> String {
        format!("{}.idx", self.grib_url(cycle, forecast_hour))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grib_url() {
        let cycle: ModelCycle = "20240929/06".parse().unwrap();
        let source = NoaaSource::default();

        assert_eq!(
            source.grib_url(&cycle, 3),
            "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod/gfs.20240929/06/atmos/gfs.t06z.pgrb2.0p50.f003"
        );
        assert_eq!(
            source.index_url(&cycle, 3),
            format!("{}.idx", source.grib_url(&cycle, 3))
        );
    }

    #[test]
    fn test_custom_base_and_resolution() {
        let cycle: ModelCycle = "20240101/18".parse().unwrap();
        let source = NoaaSource {
            base_url: "http://127.0.0.1:9000/".to_string(),
            model: ModelKind::Atmos,
            resolution: GridResolution::Quarter,
        };

        assert_eq!(
            source.grib_url(&cycle, 120),
            "http://127.0.0.1:9000/gfs.20240101/18/atmos/gfs.t18z.pgrb2.0p25.f120"
        );
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("1p00".parse::<GridResolution>().unwrap(), GridResolution::One);
        assert!("2p00".parse::<GridResolution>().is_err());
        assert_eq!("WAVE".parse::<ModelKind>().unwrap(), ModelKind::Wave);
        assert_eq!(GridResolution::Quarter.degrees(), 0.25);
    }
}
