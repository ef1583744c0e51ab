//! Domain layer for the shared-cart system.
//!
//! This crate provides:
//! - [`Catalog`] trait and the seeded [`StaticCatalog`] product table
//! - [`CartStore`], the single authoritative cart, serializing every mutation
//! - Value types for cart lines, prices and mutation commands

pub mod cart;
pub mod catalog;
pub mod error;

pub use cart::{
    CartChange, CartLine, CartMutation, CartState, CartStore, MAX_LINE_QUANTITY, Money,
};
pub use catalog::{Catalog, Product, StaticCatalog};
pub use common::{OperationKind, ProductId, UserId};
pub use error::CartError;
