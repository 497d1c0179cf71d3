//! Device registration routes, called by the mobile app.

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::Value;

use matchday_common::error::AppError;

use crate::routes::{required, success};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/unregister", post(unregister))
}

/// Form parameters sent by the device.
#[derive(Debug, Deserialize)]
pub struct DeviceParams {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
    #[serde(rename = "regId")]
    pub reg_id: Option<String>,
}

/// POST /register: Store or refresh the push token of a device.
async fn register(
    State(state): State<AppState>,
    Form(params): Form<DeviceParams>,
) -> Result<Json<Value>, AppError> {
    let device_id = required(params.device_id, "deviceId")?;
    let reg_id = required(params.reg_id, "regId")?;

    state.store.register(&device_id, &reg_id);
    Ok(success())
}

/// POST /unregister: Clear the push token of a device.
///
/// `regId` is accepted for compatibility but the device id alone decides.
async fn unregister(
    State(state): State<AppState>,
    Form(params): Form<DeviceParams>,
) -> Result<Json<Value>, AppError> {
    let device_id = required(params.device_id, "deviceId")?;

    state.store.unregister(&device_id);
    Ok(success())
}
