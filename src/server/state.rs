//! Shared application state handed to every handler

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheManager, CachedData};
use crate::data::{FetchError, ForecastQuery, UpstreamClient, TODAY_CACHE_KEY};

/// The cache and upstream client, built once at startup
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(cache: CacheManager, upstream: UpstreamClient) -> Self {
        Self {
            cache: Arc::new(cache),
            upstream: Arc::new(upstream),
        }
    }

    /// Today's observations document, through the cache
    pub async fn today(&self) -> Result<CachedData<Value>, FetchError> {
        self.cache
            .get(TODAY_CACHE_KEY, self.cache.max_age(), || {
                self.upstream.fetch_today()
            })
            .await
    }

    /// A forecast for `query`, cached per parameter set
    pub async fn forecast(&self, query: &ForecastQuery) -> Result<CachedData<Value>, FetchError> {
        self.cache
            .get(&query.cache_key(), self.cache.max_age(), || {
                self.upstream.fetch_forecast(query)
            })
            .await
    }
}
