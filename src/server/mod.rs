//! HTTP API
//!
//! Builds the axum router exposing the cached weather endpoints and the cache
//! diagnostics.

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/weather/today", get(handlers::today))
        .route("/weather/stations", get(handlers::list_stations))
        .route("/weather/stations/{id}", get(handlers::get_station))
        .route(
            "/weather/provinces/{province}",
            get(handlers::stations_by_province),
        )
        .route("/weather/forecast", get(handlers::forecast))
        .route("/cache/status", get(handlers::cache_status))
        .route("/cache/status/{key}", get(handlers::cache_key_status))
        .route(
            "/cache/clear",
            get(handlers::clear_cache).post(handlers::clear_cache),
        )
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
