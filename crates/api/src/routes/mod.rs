pub mod broadcast;
pub mod devices;
pub mod favourites;
pub mod health;
pub mod home;

use axum::{Json, Router};
use serde_json::{Value, json};

use matchday_common::error::AppError;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(home::router())
        .merge(devices::router())
        .merge(favourites::router())
        .merge(broadcast::router())
        .with_state(state)
}

/// Reject absent or blank form parameters.
pub(crate) fn required(value: Option<String>, name: &'static str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingParameter(name))
}

/// Body returned by every successful mutation.
pub(crate) fn success() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
