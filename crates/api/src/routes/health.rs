//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub attached_connections: usize,
    pub revision: u64,
}

/// GET /health: liveness plus a glimpse of the shared state.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        attached_connections: state.engine.presence().count().await,
        revision: state.engine.cart().snapshot().await.revision(),
    })
}
