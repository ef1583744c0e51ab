//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::cart::MAX_LINE_QUANTITY;

/// Errors that can occur when mutating the cart.
///
/// A failed mutation never changes the cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product is not in the catalog.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// The cart holds no line for the product.
    #[error("Item not found in cart: {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// Quantity is not an integer or leaves a line outside `1..=MAX_LINE_QUANTITY`.
    #[error("Invalid quantity: {value} (line quantity must be between 1 and {max})", max = MAX_LINE_QUANTITY)]
    InvalidQuantity { value: String },
}

impl CartError {
    pub(crate) fn invalid_quantity(value: impl std::fmt::Display) -> Self {
        CartError::InvalidQuantity {
            value: value.to_string(),
        }
    }
}
