//! Favourite team routes, called by the mobile app.

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
        .route("/favourite", post(favourite))
        .route("/unfavourite", post(unfavourite))
}

#[derive(Debug, Deserialize)]
pub struct FavouriteParams {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
    pub team: Option<String>,
}

/// POST /favourite: Set the device's favourite team. Unknown devices are ignored.
async fn favourite(
    State(state): State<AppState>,
    Form(params): Form<FavouriteParams>,
) -> Result<Json<Value>, AppError> {
    let device_id = required(params.device_id, "deviceId")?;
    let team = required(params.team, "team")?;

    state.store.set_team_preference(&device_id, &team);
    Ok(success())
}

/// POST /unfavourite: Clear the device's favourite team, whichever it was.
async fn unfavourite(
    State(state): State<AppState>,
    Form(params): Form<FavouriteParams>,
) -> Result<Json<Value>, AppError> {
    let device_id = required(params.device_id, "deviceId")?;
    let team = required(params.team, "team")?;

    state.store.clear_team_preference(&device_id, &team);
    Ok(success())
}
