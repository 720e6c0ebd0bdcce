//! Query segments: a WKT geometry paired with a time window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

const GEOMETRY_KINDS: [&str; 6] = [
    "MULTIPOLYGON",
    "MULTILINESTRING",
    "MULTIPOINT",
    "POLYGON",
    "LINESTRING",
    "POINT",
];

/// One leg of a path or area query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySegment {
    pub wkt: String,
    pub from: DateTime<Utc>,
    /// End of the window; `None` makes the segment a single instant.
    pub to: Option<DateTime<Utc>>,
}

impl QuerySegment {
    pub fn new(wkt: impl Into<String>, from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        Self {
            wkt: wkt.into(),
            from,
            to,
        }
    }

    /// Inclusive end of the window.
    pub fn until(&self) -> DateTime<Utc> {
        self.to.unwrap_or(self.from)
    }

    /// Cheap syntactic checks before handing the geometry to the database.
    pub fn validate(&self) -> ForecastResult<()> {
        validate_wkt(&self.wkt)?;
        if self.until() < self.from {
            return Err(ForecastError::InvalidTime(format!(
                "window ends ({}) before it starts ({})",
                self.until(),
                self.from
            )));
        }
        Ok(())
    }
}

/// Check the geometry tag, parenthesis balance and coordinate pairs of a WKT string.
pub fn validate_wkt(wkt: &str) -> ForecastResult<()> {
    let wkt = wkt.trim();
    let upper = wkt.to_uppercase();

    let kind = GEOMETRY_KINDS
        .iter()
        .find(|k| upper.starts_with(*k))
        .ok_or_else(|| ForecastError::InvalidWkt(format!("unsupported geometry: '{}'", wkt)))?;

    let body = wkt[kind.len()..].trim();
    if !body.starts_with('(') || !body.ends_with(')') {
        return Err(ForecastError::InvalidWkt(
            "missing surrounding parentheses".to_string(),
        ));
    }

    let mut depth = 0i32;
    for ch in body.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ForecastError::InvalidWkt(
                        "unbalanced parentheses".to_string(),
                    ));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ForecastError::InvalidWkt(
            "unbalanced parentheses".to_string(),
        ));
    }

    let coords = body.replace(['(', ')'], " ");
    let mut pairs = 0usize;
    for pair in coords.split(',') {
        let parts: Vec<&str> = pair.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(ForecastError::InvalidWkt(format!(
                "expected 'lon lat', got '{}'",
                pair.trim()
            )));
        }
        for part in parts {
            part.parse::<f64>().map_err(|_| {
                ForecastError::InvalidWkt(format!("invalid coordinate value: {}", part))
            })?;
        }
        pairs += 1;
    }

    if pairs == 0 {
        return Err(ForecastError::InvalidWkt("no coordinates".to_string()));
    }

    Ok(())
}
