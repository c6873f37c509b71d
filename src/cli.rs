//! Command-line interface parsing for weathergate
//!
//! This module handles parsing of CLI arguments (with environment variable
//! fallbacks) using clap, and validates them into the [`Settings`] the server
//! starts from.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::data::upstream::{DEFAULT_FORECAST_URL, DEFAULT_TODAY_URL};
use crate::data::UpstreamConfig;
use crate::telemetry::{LogFormat, LoggingSettings};

/// Error types for CLI argument validation
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// The log level is not one of trace, debug, info, warn, error, off
    #[error("Invalid log level: '{0}'. Valid levels: trace, debug, info, warn, error, off")]
    InvalidLogLevel(String),

    /// A timeout of zero would fail every upstream call
    #[error("--upstream-timeout must be greater than zero")]
    ZeroTimeout,
}

/// weathergate - Caching proxy for weather observations and forecasts
#[derive(Parser, Debug)]
#[command(name = "weathergate")]
#[command(about = "Caching proxy for weather observations and forecasts")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(
        long,
        env = "WEATHERGATE_BIND",
        default_value = "127.0.0.1:8000",
        value_name = "ADDR"
    )]
    pub bind: SocketAddr,

    /// URL of the daily observations document
    #[arg(long, env = "WEATHERGATE_TODAY_URL", default_value = DEFAULT_TODAY_URL, value_name = "URL")]
    pub today_url: String,

    /// URL of the hourly forecast API
    #[arg(long, env = "WEATHERGATE_FORECAST_URL", default_value = DEFAULT_FORECAST_URL, value_name = "URL")]
    pub forecast_url: String,

    /// Bearer token for the forecast API
    #[arg(long, env = "WEATHER_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Seconds a cached response is served before it is refreshed
    #[arg(long, env = "WEATHERGATE_CACHE_MAX_AGE", default_value_t = 300, value_name = "SECONDS")]
    pub cache_max_age: u64,

    /// Seconds to wait for the weather provider before giving up
    #[arg(long, env = "WEATHERGATE_UPSTREAM_TIMEOUT", default_value_t = 30, value_name = "SECONDS")]
    pub upstream_timeout: u64,

    /// Base log level (trace|debug|info|warn|error|off); RUST_LOG overrides it
    #[arg(long, env = "WEATHERGATE_LOG_LEVEL", default_value = "info", value_name = "LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// Validated startup configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub upstream: UpstreamConfig,
    pub cache_max_age: Duration,
    pub logging: LoggingSettings,
}

/// Parses a log level argument.
///
/// # Returns
/// * `Ok(LevelFilter)` if the string names a level (case-insensitive)
/// * `Err(CliError::InvalidLogLevel)` otherwise
pub fn parse_log_level(s: &str) -> Result<LevelFilter, CliError> {
    LevelFilter::from_str(s.trim()).map_err(|_| CliError::InvalidLogLevel(s.to_string()))
}

impl Settings {
    /// Creates Settings from parsed CLI arguments.
    ///
    /// An empty API token is treated as no token.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.upstream_timeout == 0 {
            return Err(CliError::ZeroTimeout);
        }

        let level = parse_log_level(&cli.log_level)?;
        let format = if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let api_token = cli
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(Settings {
            bind: cli.bind,
            upstream: UpstreamConfig {
                today_url: cli.today_url.clone(),
                forecast_url: cli.forecast_url.clone(),
                api_token,
                timeout: Duration::from_secs(cli.upstream_timeout),
            },
            cache_max_age: Duration::from_secs(cli.cache_max_age),
            logging: LoggingSettings { level, format },
        })
    }
}
