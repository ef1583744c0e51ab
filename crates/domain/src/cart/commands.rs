//! Cart mutation commands.

use common::ProductId;

/// A requested change to the shared cart.
///
/// Quantities are carried as received; the store validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add `quantity` units, creating the line if needed.
    AddItem { product_id: ProductId, quantity: i64 },

    /// Set the absolute quantity; zero or less removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },

    /// Remove the line.
    RemoveItem { product_id: ProductId },
}

impl CartMutation {
    pub fn add(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        CartMutation::AddItem {
            product_id: product_id.into(),
            quantity,
        }
    }

    pub fn set_quantity(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        CartMutation::SetQuantity {
            product_id: product_id.into(),
            quantity,
        }
    }

    pub fn remove(product_id: impl Into<ProductId>) -> Self {
        CartMutation::RemoveItem {
            product_id: product_id.into(),
        }
    }

    /// Returns the product this mutation targets.
    pub fn product_id(&self) -> &ProductId {
        match self {
            CartMutation::AddItem { product_id, .. }
            | CartMutation::SetQuantity { product_id, .. }
            | CartMutation::RemoveItem { product_id } => product_id,
        }
    }
}
