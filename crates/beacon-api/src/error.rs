//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beacon_health::HealthError;

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

/// An error rendered as `{ "error": ..., "code": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
}

impl ApiError {
    /// No status has been published yet.
    pub fn starting() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "service is starting".to_string(),
            code: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<HealthError> for ApiError {
    fn from(err: HealthError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
            code: Some(err.code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
                code: self.code,
            }),
        )
            .into_response()
    }
}
