//! Hourly forecast request parameters
//!
//! Validates the query string accepted by the forecast endpoint and turns it into
//! the parameters sent to the numerical weather prediction API.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Fields requested when the caller doesn't name any (temperature, humidity)
pub const DEFAULT_FIELDS: &str = "tc,rh";

/// Longest forecast window the upstream API serves, in hours
pub const MAX_DURATION_HOURS: u8 = 24;

/// Errors for forecast parameters outside their accepted ranges
#[derive(Debug, Error, PartialEq)]
pub enum ForecastQueryError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("lat must be between -90 and 90, got {0}")]
    Latitude(f64),

    #[error("lon must be between -180 and 180, got {0}")]
    Longitude(f64),

    #[error("fields must be a comma-separated list of field names, got '{0}'")]
    Fields(String),

    #[error("date must be an ISO date (YYYY-MM-DD), got '{0}'")]
    Date(String),

    #[error("hour must be between 0 and 23, got {0}")]
    Hour(i64),

    #[error("duration must be between 1 and 24, got {0}")]
    Duration(i64),
}

/// Raw query string of the forecast endpoint, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub fields: Option<String>,
    pub date: Option<String>,
    pub hour: Option<i64>,
    pub duration: Option<i64>,
}

/// A validated forecast request
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub lat: f64,
    pub lon: f64,
    /// Normalized comma-separated field list
    pub fields: String,
    pub date: NaiveDate,
    pub hour: u8,
    pub duration: u8,
}

impl ForecastParams {
    /// Validates the parameters, filling in defaults
    ///
    /// # Arguments
    /// * `today` - Date used when the caller gives none
    pub fn validate(self, today: NaiveDate) -> Result<ForecastQuery, ForecastQueryError> {
        let lat = self.lat.ok_or(ForecastQueryError::Missing("lat"))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ForecastQueryError::Latitude(lat));
        }

        let lon = self.lon.ok_or(ForecastQueryError::Missing("lon"))?;
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ForecastQueryError::Longitude(lon));
        }

        let fields = match self.fields {
            Some(raw) => normalize_fields(&raw)?,
            None => DEFAULT_FIELDS.to_string(),
        };

        let date = match self.date {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| ForecastQueryError::Date(raw))?,
            None => today,
        };

        let hour = self.hour.unwrap_or(0);
        if !(0..=23).contains(&hour) {
            return Err(ForecastQueryError::Hour(hour));
        }

        let duration = self.duration.unwrap_or(1);
        if !(1..=i64::from(MAX_DURATION_HOURS)).contains(&duration) {
            return Err(ForecastQueryError::Duration(duration));
        }

        Ok(ForecastQuery {
            lat: round_coordinate(lat),
            lon: round_coordinate(lon),
            fields,
            date,
            hour: hour as u8,
            duration: duration as u8,
        })
    }
}

/// Rounds to four decimal places (about 11 m), the precision used for caching
fn round_coordinate(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Trims each field name and rejects empty or non-identifier names
fn normalize_fields(raw: &str) -> Result<String, ForecastQueryError> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    let valid = fields.iter().all(|field| {
        !field.is_empty()
            && field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(ForecastQueryError::Fields(raw.to_string()));
    }
    Ok(fields.join(","))
}

impl ForecastQuery {
    /// Cache key covering every parameter that changes the upstream answer
    pub fn cache_key(&self) -> String {
        format!(
            "forecast:{:.4}:{:.4}:{}:{}:{}:{}",
            self.lat, self.lon, self.fields, self.date, self.hour, self.duration
        )
    }

    /// Query string pairs for the upstream forecast API
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("lat", self.lat.to_string()),
            ("lon", self.lon.to_string()),
            ("fields", self.fields.clone()),
            ("date", self.date.format("%Y-%m-%d").to_string()),
            ("hour", self.hour.to_string()),
            ("duration", self.duration.to_string()),
        ]
    }
}
