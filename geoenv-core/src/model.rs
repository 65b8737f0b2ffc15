use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GeoEnvError;

pub const DEFAULT_DAYS_BACK: u32 = 30;
pub const MAX_DAYS_BACK: u32 = 365;

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoEnvError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoEnvError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoEnvError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Inclusive calendar range scanned for the most recent observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A coordinate plus the lookback period used for every vegetation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWindow {
    pub coordinate: Coordinate,
    pub days_back: u32,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn new(coordinate: Coordinate, days_back: i64, end: NaiveDate) -> Result<Self, GeoEnvError> {
        if days_back < 1 || days_back > i64::from(MAX_DAYS_BACK) {
            return Err(GeoEnvError::InvalidDaysBack(days_back));
        }
        Ok(Self {
            coordinate,
            days_back: days_back as u32,
            end,
        })
    }

    /// Window ending on the current UTC date.
    pub fn ending_today(coordinate: Coordinate, days_back: i64) -> Result<Self, GeoEnvError> {
        Self::new(coordinate, days_back, Utc::now().date_naive())
    }

    pub fn start(&self) -> NaiveDate {
        self.end - Duration::days(i64::from(self.days_back))
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start(),
            end: self.end,
        }
    }
}
