//! Route handlers.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod presence;
pub mod products;
pub mod ws;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
