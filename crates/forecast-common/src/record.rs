//! Aggregated per-cell records and the observations persisted from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cell::CellKey;
use crate::layer::Parameter;
use crate::time::ModelCycle;

/// One optional value per tracked parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterValues {
    pub prmsl: Option<f64>,
    pub land: Option<f64>,
    pub tmp: Option<f64>,
    pub ugrd: Option<f64>,
    pub vgrd: Option<f64>,
    pub rh: Option<f64>,
    pub crain: Option<f64>,
    pub vis: Option<f64>,
}

impl ParameterValues {
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Prmsl => self.prmsl,
            Parameter::Land => self.land,
            Parameter::Tmp => self.tmp,
            Parameter::Ugrd => self.ugrd,
            Parameter::Vgrd => self.vgrd,
            Parameter::Rh => self.rh,
            Parameter::Crain => self.crain,
            Parameter::Vis => self.vis,
        }
    }

    pub fn set(&mut self, parameter: Parameter, value: f64) {
        let slot = match parameter {
            Parameter::Prmsl => &mut self.prmsl,
            Parameter::Land => &mut self.land,
            Parameter::Tmp => &mut self.tmp,
            Parameter::Ugrd => &mut self.ugrd,
            Parameter::Vgrd => &mut self.vgrd,
            Parameter::Rh => &mut self.rh,
            Parameter::Crain => &mut self.crain,
            Parameter::Vis => &mut self.vis,
        };
        *slot = Some(value);
    }

    /// Parameters that carry a value.
    pub fn present(&self) -> Vec<Parameter> {
        Parameter::ALL
            .iter()
            .copied()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }
}

/// All parameter values gathered for one cell at one forecast hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub lat: f64,
    pub lng: f64,
    pub forecast_hour: u32,
    pub values: ParameterValues,
}

impl AggregateRecord {
    pub fn new(lat: f64, lng: f64, forecast_hour: u32) -> Self {
        Self {
            lat,
            lng,
            forecast_hour,
            values: ParameterValues::default(),
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.lat, self.lng, self.forecast_hour)
    }

    /// Convert into a storable observation of `cycle`.
    pub fn to_observation(&self, cycle: &ModelCycle) -> Observation {
        let v = &self.values;
        Observation {
            cell_id: self.key().cell_id(),
            date_time: cycle.valid_time(self.forecast_hour).valid_datetime(),
            is_ground: v.land.map(|land| land != 0.0),
            pressure: v.prmsl.map(|x| x as f32),
            temperature: v.tmp.map(|x| x as f32),
            u_wind: v.ugrd.map(|x| x as f32),
            v_wind: v.vgrd.map(|x| x as f32),
            c_rain: v.crain.map(|x| x as f32),
            r_humidity: v.rh.map(|x| x as f32),
            visibility: v.vis.map(|x| x as f32),
        }
    }
}

/// A forecast observation keyed by (cell_id, date_time).
///
/// Absent measurements are stored as NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub cell_id: i64,
    pub date_time: DateTime<Utc>,
    pub is_ground: Option<bool>,
    pub pressure: Option<f32>,
    pub temperature: Option<f32>,
    pub u_wind: Option<f32>,
    pub v_wind: Option<f32>,
    pub c_rain: Option<f32>,
    pub r_humidity: Option<f32>,
    pub visibility: Option<f32>,
}
