//! Outbound channels of open connections.

use std::collections::HashMap;
use std::sync::Arc;

use common::ConnectionId;
use tokio::sync::{RwLock, mpsc};

use crate::protocol::ServerEvent;

/// Events a connection may have queued before it is considered stalled.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

type Outbox = mpsc::Sender<ServerEvent>;

/// Registry of per-connection outbound channels.
///
/// Delivery is best effort: a connection whose receiver is gone is skipped
/// and nothing is queued for redelivery. A connection whose queue is full is
/// dropped from the hub, which closes its channel and ends its writer.
#[derive(Clone)]
pub struct ConnectionHub {
    outboxes: Arc<RwLock<HashMap<ConnectionId, Outbox>>>,
    capacity: usize,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOX_CAPACITY)
    }

    /// Creates a hub whose channels hold at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outboxes: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Opens a channel for a new connection.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.outboxes.write().await.insert(id, tx);
        (id, rx)
    }

    /// Whether a connection is open, i.e. registered and not yet dropped.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.outboxes.read().await.contains_key(&id)
    }

    /// Drops the channel of a connection. Returns false if it was not open.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.outboxes.write().await.remove(&id).is_some()
    }

    /// Sends an event to one connection.
    pub async fn send(&self, id: ConnectionId, event: ServerEvent) -> bool {
        let outbox = self.outboxes.read().await.get(&id).cloned();
        match outbox {
            Some(tx) => self.deliver(&[(id, tx)], event).await == 1,
            None => false,
        }
    }

    /// Sends an event to each target that is still open.
    ///
    /// The target channels are copied out first, so the registry lock is not
    /// held while sending. Returns the number of deliveries.
    pub async fn broadcast(&self, targets: &[ConnectionId], event: &ServerEvent) -> usize {
        let outboxes: Vec<(ConnectionId, Outbox)> = {
            let map = self.outboxes.read().await;
            targets
                .iter()
                .filter_map(|id| map.get(id).map(|tx| (*id, tx.clone())))
                .collect()
        };

        let delivered = self.deliver(&outboxes, event.clone()).await;

        metrics::counter!("sync_broadcasts_total", "event" => event.kind()).increment(1);
        tracing::trace!(
            event = event.kind(),
            targets = targets.len(),
            delivered,
            "broadcast"
        );
        delivered
    }

    async fn deliver(&self, outboxes: &[(ConnectionId, Outbox)], event: ServerEvent) -> usize {
        let mut delivered = 0;
        let mut stalled = Vec::new();
        for (id, tx) in outboxes {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => stalled.push(*id),
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        if !stalled.is_empty() {
            let mut map = self.outboxes.write().await;
            for id in stalled {
                map.remove(&id);
                metrics::counter!("sync_outbox_overflow_total").increment(1);
                tracing::warn!(connection_id = %id, "outbound queue full, dropping connection");
            }
        }
        delivered
    }

    /// Number of open connections, attached or not.
    pub async fn len(&self) -> usize {
        self.outboxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
