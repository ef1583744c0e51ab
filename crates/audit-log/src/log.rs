use async_trait::async_trait;
use common::{OperationKind, ProductId, UserId};

use crate::AuditEntry;

/// Number of entries a log keeps unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 100;

/// Number of entries `recent` returns when no positive limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Append-only, bounded log of accepted mutations.
///
/// Recording never fails. Once the log holds its capacity, each new entry
/// evicts the oldest one.
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
    /// Appends an entry and returns it.
    async fn record(
        &self,
        user_id: UserId,
        operation: OperationKind,
        product_id: ProductId,
        product_name: String,
    ) -> AuditEntry;

    /// Returns up to `limit` entries, most recent first.
    ///
    /// A limit of zero or less means [`DEFAULT_RECENT_LIMIT`].
    async fn recent(&self, limit: i64) -> Vec<AuditEntry>;

    /// Returns the number of retained entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Resolves a caller-supplied limit to an entry count.
pub(crate) fn effective_limit(limit: i64) -> usize {
    if limit <= 0 {
        DEFAULT_RECENT_LIMIT
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}
