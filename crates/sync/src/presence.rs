//! Registry of attached connections.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ConnectionId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Who is attached on one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub username: String,
    pub connection_id: ConnectionId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub connected_at: DateTime<Utc>,
}

impl PresenceEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(user_id: UserId, username: impl Into<String>, connection_id: ConnectionId) -> Self {
        Self {
            user_id,
            username: username.into(),
            connection_id,
            connected_at: Utc::now(),
        }
    }
}

/// Attached connections keyed by connection id.
///
/// The same user may appear on several connections; only the connection id
/// is unique.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<ConnectionId, PresenceEntry>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one it replaced on the same connection.
    pub async fn add(&self, entry: PresenceEntry) -> Option<PresenceEntry> {
        self.entries
            .write()
            .await
            .insert(entry.connection_id, entry)
    }

    /// Removes the entry for a connection.
    pub async fn remove(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        self.entries.write().await.remove(&connection_id)
    }

    pub async fn find_by_connection(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        self.entries.read().await.get(&connection_id).cloned()
    }

    /// Returns every entry, oldest connection first.
    pub async fn all(&self) -> Vec<PresenceEntry> {
        let mut all: Vec<_> = self.entries.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then(a.connection_id.cmp(&b.connection_id))
        });
        all
    }

    /// Returns the ids of every attached connection.
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.entries.read().await.keys().copied().collect()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
