//! Bounded audit trail of accepted cart mutations.
//!
//! [`AuditLog`] is the seam the sync engine records through;
//! [`InMemoryAuditLog`] keeps the most recent [`DEFAULT_CAPACITY`] entries and
//! serves them newest first.

pub mod entry;
pub mod log;
pub mod memory;

pub use common::{OperationKind, ProductId, UserId};
pub use entry::{AuditEntry, EntryId};
pub use log::{AuditLog, DEFAULT_CAPACITY, DEFAULT_RECENT_LIMIT};
pub use memory::InMemoryAuditLog;
