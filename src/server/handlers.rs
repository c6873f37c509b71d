//! Route handlers

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::cache::{CacheSource, CacheStatus};
use crate::data::{
    extract_records, filter_by_province, find_station, known_ids, known_provinces,
    stations_from_document, ForecastParams,
};

use super::error::ApiError;
use super::state::AppState;

/// JSON response tagged with where the data came from
fn cached_json(source: CacheSource, body: impl Serialize) -> Response {
    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        HeaderName::from_static("x-cache"),
        HeaderValue::from_static(source.as_header_value()),
    );
    response
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn today(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cached = state.today().await?;
    Ok(cached_json(cached.source, cached.data))
}

pub async fn list_stations(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cached = state.today().await?;
    let records = extract_records(&cached.data);
    Ok(cached_json(
        cached.source,
        json!({
            "count": records.len(),
            "fetched_at": cached.fetched_at,
            "stations": records,
        }),
    ))
}

pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let cached = state.today().await?;
    let stations = stations_from_document(&cached.data);

    match find_station(&stations, &id) {
        Some(station) => Ok(cached_json(cached.source, &station.record)),
        None => Err(ApiError::not_found(
            format!("Station '{id}' not found"),
            "stations",
            &known_ids(&stations),
        )),
    }
}

pub async fn stations_by_province(
    State(state): State<AppState>,
    Path(province): Path<String>,
) -> Result<Response, ApiError> {
    let cached = state.today().await?;
    let stations = stations_from_document(&cached.data);
    let matches = filter_by_province(&stations, &province);

    if matches.is_empty() {
        return Err(ApiError::not_found(
            format!("No stations found for province '{province}'"),
            "provinces",
            &known_provinces(&stations),
        ));
    }

    let records: Vec<&Value> = matches.iter().map(|station| &station.record).collect();
    Ok(cached_json(
        cached.source,
        json!({
            "province": province,
            "count": records.len(),
            "stations": records,
        }),
    ))
}

pub async fn forecast(
    State(state): State<AppState>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let query = params.validate(Utc::now().date_naive())?;

    let cached = state.forecast(&query).await?;
    Ok(cached_json(cached.source, cached.data))
}

#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    pub max_age_seconds: u64,
    pub count: usize,
    pub entries: Vec<CacheStatus>,
}

pub async fn cache_status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    let entries = state.cache.status_all();
    Json(CacheStatusResponse {
        max_age_seconds: state.cache.max_age().as_secs(),
        count: entries.len(),
        entries,
    })
}

pub async fn cache_key_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<CacheStatus> {
    Json(state.cache.status(&key))
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.cache.clear();
    info!(cleared, "Cache cleared on request");
    Json(json!({ "cleared": cleared }))
}
