//! Presence endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use sync::PresenceChanged;

use crate::AppState;

/// GET /api/presence: attached users, oldest connection first.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<PresenceChanged> {
    Json(PresenceChanged::new(state.engine.presence().all().await))
}
