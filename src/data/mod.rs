//! Upstream weather data for weathergate
//!
//! This module contains the client for the weather provider API, the forecast
//! request parameters, and the helpers that turn the provider's loosely shaped
//! observations document into station records.

pub mod forecast;
pub mod stations;
pub mod upstream;

pub use forecast::{ForecastParams, ForecastQuery, ForecastQueryError};
pub use stations::{
    extract_records, filter_by_province, find_station, known_ids, known_provinces,
    stations_from_document, Station,
};
pub use upstream::{FetchError, UpstreamClient, UpstreamConfig};

/// Cache key for the daily observations document
///
/// The station endpoints read from the same cached document.
pub const TODAY_CACHE_KEY: &str = "weather_today";
