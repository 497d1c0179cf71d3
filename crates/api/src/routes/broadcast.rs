//! Broadcast trigger, used from the browser only.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use matchday_common::error::AppError;
use matchday_notifier::{BroadcastSummary, PushMessage};

use crate::state::AppState;

const HOME_TEAM: &str = "Man Utd 1";
const AWAY_TEAM: &str = "Arsenal 0";

pub fn router() -> Router<AppState> {
    Router::new().route("/sendAllMessages", post(send_all_messages))
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub status: String,
    pub batches: usize,
    pub matched: usize,
    pub considered: usize,
    pub found: bool,
}

impl From<BroadcastSummary> for BroadcastResponse {
    fn from(summary: BroadcastSummary) -> Self {
        Self {
            status: summary.to_string(),
            batches: summary.batches,
            matched: summary.matched,
            considered: summary.considered,
            found: summary.found,
        }
    }
}

/// POST /sendAllMessages: Schedule the score update for every fan of the
/// configured teams. Returns once the batches are queued.
async fn send_all_messages(
    State(state): State<AppState>,
) -> Result<Json<BroadcastResponse>, AppError> {
    let message = PushMessage::match_score(HOME_TEAM, AWAY_TEAM);

    match state
        .dispatcher
        .broadcast(&state.broadcast_filter, message)
        .await
    {
        Ok(summary) => {
            let response = BroadcastResponse::from(summary);
            *state.last_status.write() = Some(response.status.clone());
            Ok(Json(response))
        }
        Err(e) => {
            tracing::error!(error = %e, "Broadcast could not be scheduled");
            *state.last_status.write() = Some(format!("Broadcast failed: {}", e));
            Err(e.into())
        }
    }
}
