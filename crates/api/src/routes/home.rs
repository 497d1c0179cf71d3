//! Home view: registration counts and the last broadcast status.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    /// Devices ever registered.
    pub devices: usize,
    /// Devices that currently hold a push token.
    pub active: usize,
    /// Status of the most recent broadcast.
    pub status: Option<String>,
}

/// GET /home: Summary shown to the operator who triggers broadcasts.
async fn home(State(state): State<AppState>) -> Json<HomeView> {
    Json(HomeView {
        devices: state.store.len(),
        active: state.store.active_count(),
        status: state.last_status.read().clone(),
    })
}
