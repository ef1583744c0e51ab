//! Real-time synchronization of the shared cart.
//!
//! This crate owns the per-connection protocol:
//! - [`protocol`] wire events exchanged with clients
//! - [`PresenceRegistry`] of attached connections
//! - [`ConnectionHub`] of outbound channels used for unicast and broadcast
//! - [`SyncEngine`] applying mutations and fanning out the results

pub mod engine;
pub mod error;
pub mod hub;
pub mod presence;
pub mod protocol;

pub use engine::{Connection, SyncEngine};
pub use error::SyncError;
pub use hub::{ConnectionHub, DEFAULT_OUTBOX_CAPACITY};
pub use presence::{PresenceEntry, PresenceRegistry};
pub use protocol::{
    AttachPayload, ClientEvent, ErrorNotice, OperationNotice, PresenceChanged, QuantityPayload,
    RemovePayload, ServerEvent, StateSync,
};
