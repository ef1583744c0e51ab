//! Shared cart aggregate and its store.

mod commands;
mod state;
mod store;
mod value_objects;

pub use commands::CartMutation;
pub use state::CartState;
pub use store::{CartChange, CartStore};
pub use value_objects::{CartLine, Money};

/// Upper bound for the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 9_999;
