//! HTTP error responses
//!
//! Every failure a handler can hit is converted to an [`ApiError`], which renders
//! as `{ "error": { "code", "message", "hint"? } }` with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::data::{FetchError, ForecastQueryError};

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UPSTREAM_UNAUTHORIZED: &str = "upstream_unauthorized";
    pub const MISSING_CREDENTIAL: &str = "missing_credential";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, None)
    }

    /// 404 whose message lists what does exist
    pub fn not_found(message: impl Into<String>, known_label: &str, known: &[String]) -> Self {
        let message = message.into();
        let message = if known.is_empty() {
            format!("{message}. No {known_label} are currently available")
        } else {
            format!("{message}. Known {known_label}: {}", known.join(", "))
        };
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::MissingCredential => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::MISSING_CREDENTIAL,
                err.to_string(),
                Some("set WEATHER_API_TOKEN or pass --api-token".to_string()),
            ),
            FetchError::Unauthorized => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM_UNAUTHORIZED,
                err.to_string(),
                None,
            ),
            FetchError::Timeout(_)
            | FetchError::Connection(_)
            | FetchError::Status { .. }
            | FetchError::Malformed(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UPSTREAM_UNAVAILABLE,
                err.to_string(),
                None,
            ),
        }
    }
}

impl From<ForecastQueryError> for ApiError {
    fn from(err: ForecastQueryError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), code = self.code, message = %self.message, "Request failed");
        } else {
            warn!(status = self.status.as_u16(), code = self.code, message = %self.message, "Request rejected");
        }

        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
