//! HTTP and WebSocket server for the shared cart.
//!
//! Clients keep a WebSocket open at `/ws` to attach and mutate the cart; the
//! REST routes are a read-only mirror of the same state. Structured logging
//! comes from tracing and metrics are exported for Prometheus.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use audit_log::InMemoryAuditLog;
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use domain::{CartStore, StaticCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use sync::SyncEngine;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Engine type served by this binary.
pub type CartEngine = SyncEngine<StaticCatalog, InMemoryAuditLog>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub engine: CartEngine,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/ws", get(routes::ws::upgrade))
        .route("/api/products", get(routes::products::list))
        .route("/api/products/{id}", get(routes::products::get))
        .route("/api/cart", get(routes::cart::get))
        .route("/api/cart/logs", get(routes::cart::logs))
        .route("/api/presence", get(routes::presence::get))
        .with_state(state)
        .merge(metrics_router)
        .fallback(routes::not_found)
        .layer(cors_layer(config.client_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: the seeded catalog, an empty cart
/// and an audit log of default capacity.
pub fn create_default_state() -> Arc<AppState> {
    let cart = CartStore::new(Arc::new(StaticCatalog::seeded()));
    let engine = SyncEngine::new(cart, InMemoryAuditLog::new());
    Arc::new(AppState { engine })
}

fn cors_layer(client_origin: Option<&str>) -> CorsLayer {
    let origin = match client_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "invalid CLIENT_ORIGIN, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
