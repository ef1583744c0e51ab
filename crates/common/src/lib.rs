//! Identifiers and small value types shared by every shared-cart crate.

pub mod types;

pub use types::{ConnectionId, OperationKind, ProductId, UserId};
