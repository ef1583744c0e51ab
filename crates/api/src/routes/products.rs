//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use domain::{CartError, Catalog, Product};

use crate::AppState;
use crate::error::ApiError;

/// GET /api/products: every product, ordered by id.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Product>> {
    Json(state.engine.cart().catalog().list())
}

/// GET /api/products/{id}: one product.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = ProductId::new(id);
    state
        .engine
        .cart()
        .catalog()
        .get(&product_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(CartError::ProductNotFound { product_id }.to_string()))
}
