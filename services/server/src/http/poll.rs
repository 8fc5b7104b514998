use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use bayeux::PollRequest;

use crate::state::AppState;

/// `POST /poll` — the bespoke JSON polling connector.
pub async fn handle(State(state): State<AppState>, Json(request): Json<PollRequest>) -> impl IntoResponse {
    Json(state.poll.handle_poll(request).await)
}
