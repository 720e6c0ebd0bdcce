//! Request and response bodies of the `bywkt` endpoint.

use chrono::{DateTime, Utc};
use forecast_common::{round_to_cadence, QuerySegment};
use serde::{Deserialize, Serialize};
use storage::ShapeSeries;

/// A field that can be requested per forecast entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "temperature-2m")]
    Temperature,
    #[serde(rename = "pressure-surface")]
    Pressure,
    #[serde(rename = "rhumidity-surface")]
    RelativeHumidity,
    #[serde(rename = "crain-surface")]
    CategoricalRain,
    #[serde(rename = "wind-10m")]
    Wind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WktRequestBody {
    /// Fields to return; every field when empty.
    #[serde(default)]
    pub components: Vec<Component>,
    pub shapes: Vec<WktRequest>,
}

impl WktRequestBody {
    fn wants(&self, component: Component) -> bool {
        self.components.is_empty() || self.components.contains(&component)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WktRequest {
    pub wkt: String,
    pub from: DateTime<Utc>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl WktRequest {
    /// Segment with both ends snapped to the model cadence.
    pub fn to_segment(&self) -> QuerySegment {
        QuerySegment::new(
            self.wkt.clone(),
            round_to_cadence(self.from),
            self.to.map(round_to_cadence),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindInfo {
    pub u: f64,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDetail {
    #[serde(rename = "date-time")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "temperature-2m", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "pressure-surface", skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(rename = "rhumidity-surface", skip_serializing_if = "Option::is_none")]
    pub r_humidity: Option<f64>,
    #[serde(rename = "crain-surface", skip_serializing_if = "Option::is_none")]
    pub c_rain: Option<f64>,
    #[serde(rename = "wind-10m", skip_serializing_if = "Option::is_none")]
    pub wind: Option<WindInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub shape: String,
    pub forecast: Vec<ForecastDetail>,
}

impl ForecastResponse {
    /// Render one shape series, keeping only the requested components.
    pub fn from_series(series: ShapeSeries, request: &WktRequestBody) -> Self {
        let pick = |component, value: Option<f64>| value.filter(|_| request.wants(component));

        let forecast = series
            .rows
            .into_iter()
            .map(|row| ForecastDetail {
                date_time: row.date_time,
                temperature: pick(Component::Temperature, row.temperature),
                pressure: pick(Component::Pressure, row.pressure),
                r_humidity: pick(Component::RelativeHumidity, row.r_humidity),
                c_rain: pick(Component::CategoricalRain, row.c_rain),
                wind: match (row.u_wind, row.v_wind) {
                    (Some(u), Some(v)) if request.wants(Component::Wind) => Some(WindInfo { u, v }),
                    _ => None,
                },
            })
            .collect();

        Self {
            shape: series.shape,
            forecast,
        }
    }
}
