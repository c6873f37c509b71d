//! Weather provider API client
//!
//! This module performs the outbound HTTP calls to the weather provider: the
//! daily observations document and the authenticated hourly forecast API. Every
//! failure is classified into a [`FetchError`] so the cache and the HTTP layer can
//! decide what to do with it.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::ForecastQuery;

/// Daily observations for every weather station
pub const DEFAULT_TODAY_URL: &str =
    "https://data.tmd.go.th/api/WeatherToday/V2/?uid=api&ukey=api12345&format=json";

/// Hourly forecast at a location
pub const DEFAULT_FORECAST_URL: &str =
    "https://data.tmd.go.th/nwpapi/v1/forecast/location/hourly/at";

/// Default timeout for a single upstream call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent sent with every upstream request
const USER_AGENT: &str = concat!("weathergate/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur when fetching from the weather provider
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The call did not complete within the configured timeout
    #[error("upstream request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The host could not be reached
    #[error("failed to reach upstream: {0}")]
    Connection(String),

    /// The upstream answered with a non-2xx status
    #[error("upstream returned HTTP {code}")]
    Status { code: u16 },

    /// The upstream rejected the bearer token
    #[error("upstream rejected the API token (HTTP 401); check WEATHER_API_TOKEN")]
    Unauthorized,

    /// The body was not valid JSON
    #[error("failed to parse upstream response: {0}")]
    Malformed(String),

    /// No API token is configured for an authenticated endpoint
    #[error("WEATHER_API_TOKEN is not configured")]
    MissingCredential,
}

/// Where and how to reach the weather provider
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub today_url: String,
    pub forecast_url: String,
    /// Bearer token for the forecast API
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            today_url: DEFAULT_TODAY_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the weather provider API
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Creates a client with fixed `Accept`/`User-Agent` headers and the configured timeout
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch today's observations document
    pub async fn fetch_today(&self) -> Result<Value, FetchError> {
        self.get_json(&self.config.today_url, &[], None).await
    }

    /// Fetch an hourly forecast
    ///
    /// # Returns
    /// * `Ok(Value)` - The forecast document as returned by the provider
    /// * `Err(FetchError::MissingCredential)` - No token configured; nothing is sent
    /// * `Err(FetchError::Unauthorized)` - The provider rejected the token
    /// * `Err(FetchError)` - Any other classified failure
    pub async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<Value, FetchError> {
        let token = self
            .config
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(FetchError::MissingCredential)?;

        self.get_json(&self.config.forecast_url, &query.query_pairs(), Some(token))
            .await
    }

    /// Performs one GET and parses the body as JSON
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Value, FetchError> {
        let started = Instant::now();

        let mut request = self.client.get(url).query(query);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.classify(url, e))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && bearer.is_some() {
            warn!(url, "Upstream rejected API token");
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| self.classify(url, e))?;
        let document: Value = serde_json::from_str(&text).map_err(|e| {
            warn!(url, error = %e, "Upstream body is not valid JSON");
            FetchError::Malformed(e.to_string())
        })?;

        debug!(
            url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched upstream document"
        );
        Ok(document)
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            warn!(url, timeout_s = self.config.timeout.as_secs(), "Upstream request timed out");
            FetchError::Timeout(self.config.timeout)
        } else if error.is_decode() {
            FetchError::Malformed(error.to_string())
        } else {
            warn!(url, error = %error, "Upstream request failed");
            FetchError::Connection(error.to_string())
        }
    }
}
