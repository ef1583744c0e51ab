use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OperationKind, ProductId, UserId};
use tokio::sync::RwLock;

use crate::log::{AuditLog, DEFAULT_CAPACITY, effective_limit};
use crate::AuditEntry;

/// In-memory audit log.
///
/// Entries live in a ring ordered oldest to newest; nothing survives a
/// restart. Clones share the same underlying log.
#[derive(Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
    capacity: usize,
}

impl InMemoryAuditLog {
    /// Creates an empty log holding at most [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty log holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(
        &self,
        user_id: UserId,
        operation: OperationKind,
        product_id: ProductId,
        product_name: String,
    ) -> AuditEntry {
        let entry = AuditEntry::new(user_id, operation, product_id, product_name);

        let mut entries = self.entries.write().await;
        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        tracing::debug!(
            entry_id = %entry.id,
            operation = %entry.operation,
            retained = entries.len(),
            "audit entry recorded"
        );
        entry
    }

    async fn recent(&self, limit: i64) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .take(effective_limit(limit))
            .cloned()
            .collect()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_RECENT_LIMIT;

    async fn record_n(log: &InMemoryAuditLog, n: usize) -> Vec<AuditEntry> {
        let mut recorded = Vec::with_capacity(n);
        for i in 0..n {
            recorded.push(
                log.record(
                    UserId::new("u1"),
                    OperationKind::Add,
                    ProductId::new(format!("p{i}")),
                    format!("Product {i}"),
                )
                .await,
            );
        }
        recorded
    }

    #[tokio::test]
    async fn record_appends_entry() {
        let log = InMemoryAuditLog::new();
        let entry = log
            .record(
                UserId::new("u1"),
                OperationKind::Remove,
                ProductId::new("p1"),
                "iPhone 15 Pro".to_string(),
            )
            .await;

        assert_eq!(log.len().await, 1);
        assert_eq!(log.recent(10).await, vec![entry]);
    }

    #[tokio::test]
    async fn recent_is_most_recent_first() {
        let log = InMemoryAuditLog::new();
        let recorded = record_n(&log, 3).await;

        let recent = log.recent(10).await;
        let expected: Vec<_> = recorded.into_iter().rev().collect();
        assert_eq!(recent, expected);
    }

    #[tokio::test]
    async fn recent_honors_limit_and_default() {
        let log = InMemoryAuditLog::new();
        record_n(&log, 25).await;

        assert_eq!(log.recent(3).await.len(), 3);
        assert_eq!(log.recent(0).await.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(log.recent(-1).await.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(log.recent(500).await.len(), 25);
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted_past_capacity() {
        let log = InMemoryAuditLog::new();
        let recorded = record_n(&log, 150).await;

        let recent = log.recent(1000).await;
        assert_eq!(recent.len(), 100);
        assert_eq!(log.len().await, 100);

        let expected: Vec<_> = recorded[50..].iter().rev().cloned().collect();
        assert_eq!(recent, expected);
        for evicted in &recorded[..50] {
            assert!(recent.iter().all(|e| e.id != evicted.id));
        }
    }

    #[tokio::test]
    async fn custom_capacity_is_respected() {
        let log = InMemoryAuditLog::with_capacity(2);
        record_n(&log, 5).await;
        assert_eq!(log.len().await, 2);
        assert_eq!(log.recent(10).await[0].product_id.as_str(), "p4");
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let log = InMemoryAuditLog::new();
        let other = log.clone();
        record_n(&log, 2).await;
        assert_eq!(other.len().await, 2);
        assert!(!other.is_empty().await);
    }
}
