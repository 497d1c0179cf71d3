use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types surfaced over HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
