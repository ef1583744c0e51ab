//! The authoritative cart store.

use std::sync::Arc;

use common::{OperationKind, ProductId, UserId};
use tokio::sync::RwLock;

use super::{CartLine, CartMutation, CartState, MAX_LINE_QUANTITY};
use crate::catalog::Catalog;
use crate::error::CartError;

/// Outcome of an accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartChange {
    /// Copy of the cart right after the mutation.
    pub state: CartState,

    /// Effective kind; `SetQuantity` to zero or less reports `Remove`.
    pub operation: OperationKind,

    pub product_id: ProductId,

    /// Display name of the affected product at the time of the mutation.
    pub product_name: String,
}

/// Owner of the one shared cart.
///
/// Every mutation runs under the write half of a single lock, so mutations
/// are applied one at a time in the order they acquire it and a snapshot
/// never sees a half-applied change. Returned states are copies.
pub struct CartStore<C: Catalog> {
    catalog: Arc<C>,
    state: RwLock<CartState>,
}

impl<C: Catalog> CartStore<C> {
    /// Creates an empty cart backed by the given catalog.
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            state: RwLock::new(CartState::new()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Adds `quantity` units of a catalog product.
    #[tracing::instrument(skip(self, product_id, actor), fields(product_id = %product_id, actor = %actor))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: i64,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        let mut state = self.state.write().await;
        self.add_locked(&mut state, product_id, quantity, actor)
    }

    /// Sets the absolute quantity of an existing line.
    #[tracing::instrument(skip(self, product_id, actor), fields(product_id = %product_id, actor = %actor))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        let mut state = self.state.write().await;
        Self::set_locked(&mut state, product_id, quantity, actor)
    }

    /// Removes an existing line.
    #[tracing::instrument(skip(self, product_id, actor), fields(product_id = %product_id, actor = %actor))]
    pub async fn remove_item(
        &self,
        product_id: &ProductId,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        let mut state = self.state.write().await;
        Self::remove_locked(&mut state, product_id, actor)
    }

    /// Applies a mutation command.
    pub async fn apply(
        &self,
        mutation: &CartMutation,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        match mutation {
            CartMutation::AddItem {
                product_id,
                quantity,
            } => self.add_item(product_id, *quantity, actor).await,
            CartMutation::SetQuantity {
                product_id,
                quantity,
            } => self.set_quantity(product_id, *quantity, actor).await,
            CartMutation::RemoveItem { product_id } => self.remove_item(product_id, actor).await,
        }
    }

    /// Returns a copy of the current cart.
    pub async fn snapshot(&self) -> CartState {
        self.state.read().await.clone()
    }

    fn add_locked(
        &self,
        state: &mut CartState,
        product_id: &ProductId,
        quantity: i64,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| CartError::ProductNotFound {
                product_id: product_id.clone(),
            })?;

        if quantity < 1 {
            return Err(CartError::invalid_quantity(quantity));
        }

        let existing = state.line(product_id).map_or(0, CartLine::quantity);
        let new_quantity = i64::from(existing)
            .checked_add(quantity)
            .and_then(line_quantity)
            .ok_or_else(|| CartError::invalid_quantity(quantity))?;

        let product_name = product.name.clone();
        match state.line_mut(product_id) {
            Some(line) => line.set_quantity(new_quantity),
            None => state.push_line(CartLine::new(product, new_quantity)),
        }
        state.touch(actor);

        tracing::debug!(quantity = new_quantity, "item added");
        Ok(CartChange {
            state: state.clone(),
            operation: OperationKind::Add,
            product_id: product_id.clone(),
            product_name,
        })
    }

    fn set_locked(
        state: &mut CartState,
        product_id: &ProductId,
        quantity: i64,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        if state.line(product_id).is_none() {
            return Err(CartError::ItemNotFound {
                product_id: product_id.clone(),
            });
        }

        if quantity <= 0 {
            return Self::remove_locked(state, product_id, actor);
        }

        let new_quantity =
            line_quantity(quantity).ok_or_else(|| CartError::invalid_quantity(quantity))?;

        let line = state
            .line_mut(product_id)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
            })?;
        line.set_quantity(new_quantity);
        let product_name = line.product().name.clone();
        state.touch(actor);

        tracing::debug!(quantity = new_quantity, "quantity set");
        Ok(CartChange {
            state: state.clone(),
            operation: OperationKind::Update,
            product_id: product_id.clone(),
            product_name,
        })
    }

    fn remove_locked(
        state: &mut CartState,
        product_id: &ProductId,
        actor: &UserId,
    ) -> Result<CartChange, CartError> {
        let removed = state
            .take_line(product_id)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
            })?;
        state.touch(actor);

        tracing::debug!("item removed");
        Ok(CartChange {
            state: state.clone(),
            operation: OperationKind::Remove,
            product_id: product_id.clone(),
            product_name: removed.product().name.clone(),
        })
    }
}

fn line_quantity(quantity: i64) -> Option<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
}
