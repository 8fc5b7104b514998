use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::state::AppState;

/// `POST /bayeux` — the Bayeux long-polling connector. Accepts a bare
/// message object or a batch array and returns the corresponding reply
/// batch as a JSON array.
pub async fn handle(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    match state.bayeux.handle_batch(body).await {
        Ok(replies) => Json(replies).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}
