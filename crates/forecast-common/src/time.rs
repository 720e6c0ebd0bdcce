//! Model cycles, valid times and cadence rounding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, DurationRound, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Spacing between consecutive forecast steps.
pub const MODEL_CADENCE_HOURS: i64 = 3;

/// Cycle hours at which the model is run.
pub const CYCLE_HOURS: [u32; 4] = [0, 6, 12, 18];

/// One model run, identified by its date and cycle hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCycle {
    pub date: NaiveDate,
    pub hour: u32,
}

impl ModelCycle {
    pub fn new(date: NaiveDate, hour: u32) -> ForecastResult<Self> {
        if !CYCLE_HOURS.contains(&hour) {
            return Err(ForecastError::InvalidTime(format!(
                "cycle hour must be one of 00/06/12/18, got {:02}",
                hour
            )));
        }
        Ok(Self { date, hour })
    }

    /// Most recent cycle started at or before `now`.
    pub fn latest_before(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        let hour = CYCLE_HOURS
            .iter()
            .rev()
            .copied()
            .find(|h| *h <= now.hour())
            .unwrap_or(0);
        Self { date, hour }
    }

    /// Start of the run.
    pub fn reference_time(&self) -> DateTime<Utc> {
        let midnight = self.date.and_hms_opt(0, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&midnight) + Duration::hours(self.hour as i64)
    }

    /// Directory date component, `YYYYMMDD`.
    pub fn date_stamp(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Two-digit cycle hour, `CC`.
    pub fn hour_stamp(&self) -> String {
        format!("{:02}", self.hour)
    }

    pub fn valid_time(&self, forecast_hour: u32) -> ValidTime {
        ValidTime::new(self.reference_time(), forecast_hour)
    }
}

impl fmt::Display for ModelCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.date_stamp(), self.hour)
    }
}

impl FromStr for ModelCycle {
    type Err = ForecastError;

    /// Accepts `YYYYMMDD/HH` or `YYYYMMDDHH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '/').collect();
        if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ForecastError::InvalidTime(format!(
                "expected YYYYMMDD/HH, got '{}'",
                s
            )));
        }

        let date = NaiveDate::parse_from_str(&digits[..8], "%Y%m%d")
            .map_err(|e| ForecastError::InvalidTime(format!("{}: {}", s, e)))?;
        let hour: u32 = digits[8..]
            .parse()
            .map_err(|_| ForecastError::InvalidTime(s.to_string()))?;

        Self::new(date, hour)
    }
}

/// Represents a valid time for meteorological data.
///
/// Combines reference time (model run time) and forecast offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidTime {
    /// Model run/reference time
    pub reference_time: DateTime<Utc>,
    /// Forecast hour offset from reference time
    pub forecast_hour: u32,
}

impl ValidTime {
    pub fn new(reference_time: DateTime<Utc>, forecast_hour: u32) -> Self {
        Self {
            reference_time,
            forecast_hour,
        }
    }

    /// Calculate the actual valid time (reference + forecast offset)
    pub fn valid_datetime(&self) -> DateTime<Utc> {
        self.reference_time + Duration::hours(self.forecast_hour as i64)
    }
}

/// Round a timestamp to the nearest model step; halfway values round up.
pub fn round_to_cadence(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_round(Duration::hours(MODEL_CADENCE_HOURS))
        .unwrap_or(t)
}
