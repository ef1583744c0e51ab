//! Read-only views of the cart and its audit log.

use std::sync::Arc;

use audit_log::{AuditEntry, AuditLog, DEFAULT_RECENT_LIMIT};
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use sync::StateSync;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Kept as text so a non-numeric limit falls back to the default
    /// instead of failing the request.
    pub limit: Option<String>,
}

impl LogsQuery {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse().ok())
            .unwrap_or(DEFAULT_RECENT_LIMIT as i64)
    }
}

/// GET /api/cart: the current cart, shaped like a state sync.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<StateSync> {
    let snapshot = state.engine.cart().snapshot().await;
    Json(StateSync::from(&snapshot))
}

/// GET /api/cart/logs?limit=N: recent audit entries, newest first.
#[tracing::instrument(skip(state))]
pub async fn logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<AuditEntry>> {
    Json(state.engine.audit().recent(query.limit()).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>) -> LogsQuery {
        LogsQuery {
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(query(Some("5")).limit(), 5);
        assert_eq!(query(Some(" 7 ")).limit(), 7);
        assert_eq!(query(Some("-3")).limit(), -3);
        assert_eq!(query(Some("ten")).limit(), 10);
        assert_eq!(query(None).limit(), 10);
    }
}
