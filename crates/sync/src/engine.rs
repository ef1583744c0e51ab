//! Synchronization engine driving every connection.

use audit_log::AuditLog;
use common::{ConnectionId, UserId};
use domain::{CartChange, CartMutation, CartStore, Catalog, OperationKind};
use tokio::sync::{Mutex, mpsc};

use crate::error::SyncError;
use crate::hub::ConnectionHub;
use crate::presence::{PresenceEntry, PresenceRegistry};
use crate::protocol::{
    ClientEvent, ErrorNotice, OperationNotice, PresenceChanged, ServerEvent, StateSync,
};

/// A freshly opened connection.
///
/// The transport forwards everything received on `outbound` to the client
/// and feeds client frames back through [`SyncEngine::handle_text`].
pub struct Connection {
    pub id: ConnectionId,
    pub outbound: mpsc::Receiver<ServerEvent>,
}

/// Applies client requests to the shared cart and fans the results out.
///
/// A connection is unattached after [`open`](Self::open), attached after a
/// successful [`attach`](Self::attach), and gone for good after
/// [`detach`](Self::detach) or once the hub drops it. Only an open,
/// unattached connection can attach.
///
/// Two gates order the work:
/// - `membership` covers a presence change together with its broadcast, so
///   every presence broadcast matches one registry state.
/// - `commit` covers a cart mutation, its audit entry, its state broadcast
///   and its operation notice, so the audit log and every client see
///   mutations and notices in the order they were applied.
///
/// The cart lock is released before anything is sent. Sends never wait on a
/// slow client: they queue onto its channel, and a client whose queue is full
/// is dropped by the hub.
pub struct SyncEngine<C: Catalog, L: AuditLog> {
    cart: CartStore<C>,
    audit: L,
    presence: PresenceRegistry,
    hub: ConnectionHub,
    membership: Mutex<()>,
    commit: Mutex<()>,
}

impl<C: Catalog, L: AuditLog> SyncEngine<C, L> {
    /// Creates an engine around a cart store and an audit log.
    pub fn new(cart: CartStore<C>, audit: L) -> Self {
        Self {
            cart,
            audit,
            presence: PresenceRegistry::new(),
            hub: ConnectionHub::new(),
            membership: Mutex::new(()),
            commit: Mutex::new(()),
        }
    }

    pub fn cart(&self) -> &CartStore<C> {
        &self.cart
    }

    pub fn audit(&self) -> &L {
        &self.audit
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Registers a new, unattached connection.
    pub async fn open(&self) -> Connection {
        let (id, outbound) = self.hub.register().await;
        tracing::debug!(connection_id = %id, "connection opened");
        Connection { id, outbound }
    }

    /// Handles one text frame. Failures are reported to the sender only.
    pub async fn handle_text(&self, connection_id: ConnectionId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => self.handle(connection_id, event).await,
            Err(err) => self.reject(connection_id, &err).await,
        }
    }

    /// Handles one client event. Failures are reported to the sender only.
    pub async fn handle(&self, connection_id: ConnectionId, event: ClientEvent) {
        if let Err(err) = self.dispatch(connection_id, event).await {
            self.reject(connection_id, &err).await;
        }
    }

    /// Routes a client event to the matching operation.
    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SyncError> {
        let mutation = match event {
            ClientEvent::Attach(payload) => {
                self.attach(connection_id, UserId::new(payload.user_id), payload.username)
                    .await?;
                return Ok(());
            }
            ClientEvent::AddItem(payload) => {
                self.require_attached(connection_id, payload.user_id.as_ref())
                    .await?;
                CartMutation::add(payload.product_id.clone(), payload.quantity()?)
            }
            ClientEvent::SetQuantity(payload) => {
                self.require_attached(connection_id, payload.user_id.as_ref())
                    .await?;
                CartMutation::set_quantity(payload.product_id.clone(), payload.quantity()?)
            }
            ClientEvent::RemoveItem(payload) => {
                self.require_attached(connection_id, payload.user_id.as_ref())
                    .await?;
                CartMutation::remove(payload.product_id)
            }
        };

        self.mutate(connection_id, mutation).await?;
        Ok(())
    }

    /// Attaches a user to a connection.
    ///
    /// Registers presence, broadcasts the new presence list to every
    /// attached connection (this one included), then sends the current cart
    /// to this connection only.
    #[tracing::instrument(skip(self, user_id, username), fields(user_id = %user_id))]
    pub async fn attach(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        username: String,
    ) -> Result<PresenceEntry, SyncError> {
        let username = username.trim().to_string();
        if user_id.as_str().trim().is_empty() || username.is_empty() {
            return Err(SyncError::MalformedMessage(
                "userId and username are required".to_string(),
            ));
        }

        let entry = {
            let _membership = self.membership.lock().await;
            if !self.hub.contains(connection_id).await {
                return Err(SyncError::ConnectionClosed(connection_id));
            }
            if self
                .presence
                .find_by_connection(connection_id)
                .await
                .is_some()
            {
                return Err(SyncError::AlreadyAttached(connection_id));
            }

            let entry = PresenceEntry::new(user_id, username, connection_id);
            self.presence.add(entry.clone()).await;
            self.broadcast_presence().await;
            entry
        };

        {
            let _commit = self.commit.lock().await;
            let snapshot = self.cart.snapshot().await;
            self.hub
                .send(
                    connection_id,
                    ServerEvent::StateSync(StateSync::from(&snapshot)),
                )
                .await;
        }

        tracing::info!(username = %entry.username, "user attached");
        Ok(entry)
    }

    /// Applies a mutation on behalf of the user attached to a connection.
    ///
    /// On success the new cart goes to every attached connection, followed
    /// by an operation notice when the user and product still resolve.
    #[tracing::instrument(skip(self))]
    pub async fn mutate(
        &self,
        connection_id: ConnectionId,
        mutation: CartMutation,
    ) -> Result<CartChange, SyncError> {
        let actor = self.require_attached(connection_id, None).await?;

        let change = {
            let _commit = self.commit.lock().await;
            let change = self.cart.apply(&mutation, &actor.user_id).await?;
            self.audit
                .record(
                    actor.user_id.clone(),
                    change.operation,
                    change.product_id.clone(),
                    change.product_name.clone(),
                )
                .await;

            let targets = self.presence.connection_ids().await;
            self.hub
                .broadcast(&targets, &ServerEvent::StateSync(StateSync::from(&change.state)))
                .await;
            if let Some(notice) = self.notice_for(connection_id, &change).await {
                self.hub
                    .broadcast(&targets, &ServerEvent::OperationNotice(notice))
                    .await;
            }
            change
        };
        metrics::counter!("cart_mutations_total", "operation" => change.operation.as_str())
            .increment(1);

        tracing::info!(
            operation = %change.operation,
            product_id = %change.product_id,
            revision = change.state.revision(),
            "mutation applied"
        );
        Ok(change)
    }

    /// Ends a connection.
    ///
    /// If the connection was attached, the remaining connections receive
    /// the updated presence list. Calling this twice is harmless.
    #[tracing::instrument(skip(self))]
    pub async fn detach(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        let _membership = self.membership.lock().await;
        self.hub.unregister(connection_id).await;

        let removed = self.presence.remove(connection_id).await;
        if let Some(entry) = &removed {
            self.broadcast_presence().await;
            tracing::info!(user_id = %entry.user_id, username = %entry.username, "user detached");
        }
        removed
    }

    /// Sends an error notice to one connection.
    pub async fn reject(&self, connection_id: ConnectionId, err: &SyncError) {
        metrics::counter!("cart_mutations_rejected_total", "code" => err.code()).increment(1);
        tracing::warn!(connection_id = %connection_id, code = err.code(), error = %err, "request rejected");
        self.hub
            .send(connection_id, ServerEvent::ErrorNotice(ErrorNotice::from(err)))
            .await;
    }

    async fn require_attached(
        &self,
        connection_id: ConnectionId,
        declared: Option<&UserId>,
    ) -> Result<PresenceEntry, SyncError> {
        let entry = self
            .presence
            .find_by_connection(connection_id)
            .await
            .ok_or(SyncError::NotAttached(connection_id))?;

        if let Some(declared) = declared
            && declared != &entry.user_id
        {
            tracing::debug!(
                declared = %declared,
                attached = %entry.user_id,
                "ignoring declared user id"
            );
        }
        Ok(entry)
    }

    /// Builds the notice for an applied change, if the acting user and the
    /// product still resolve.
    async fn notice_for(
        &self,
        connection_id: ConnectionId,
        change: &CartChange,
    ) -> Option<OperationNotice> {
        let acting = self.presence.find_by_connection(connection_id).await?;
        let product = self.cart.catalog().get(&change.product_id)?;
        let quantity = match change.operation {
            OperationKind::Update => change
                .state
                .line(&change.product_id)
                .map(|line| line.quantity()),
            _ => None,
        };
        Some(OperationNotice::new(
            &acting.username,
            acting.user_id,
            change.operation,
            product.name,
            quantity,
        ))
    }

    // Callers hold `membership`.
    async fn broadcast_presence(&self) {
        let all_users = self.presence.all().await;
        let targets: Vec<ConnectionId> = all_users.iter().map(|e| e.connection_id).collect();
        metrics::gauge!("sync_attached_connections").set(targets.len() as f64);

        self.hub
            .broadcast(
                &targets,
                &ServerEvent::PresenceChanged(PresenceChanged::new(all_users)),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use audit_log::InMemoryAuditLog;
    use common::ProductId;
    use domain::{CartError, StaticCatalog};

    use super::*;

    type Engine = SyncEngine<StaticCatalog, InMemoryAuditLog>;

    fn engine() -> Engine {
        SyncEngine::new(
            CartStore::new(Arc::new(StaticCatalog::seeded())),
            InMemoryAuditLog::new(),
        )
    }

    fn drain(conn: &mut Connection) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = conn.outbound.try_recv() {
            events.push(event);
        }
        events
    }

    async fn attached(engine: &Engine, user: &str, name: &str) -> Connection {
        let conn = engine.open().await;
        engine
            .attach(conn.id, UserId::new(user), name.to_string())
            .await
            .unwrap();
        conn
    }

    #[tokio::test]
    async fn attach_broadcasts_presence_then_unicasts_state() {
        let engine = engine();
        let mut first = attached(&engine, "u1", "alice").await;
        drain(&mut first);

        let mut second = attached(&engine, "u2", "bob").await;

        let to_second = drain(&mut second);
        assert_eq!(to_second.len(), 2);
        let ServerEvent::PresenceChanged(presence) = &to_second[0] else {
            panic!("expected presence first, got {:?}", to_second[0]);
        };
        assert_eq!(presence.count, 2);
        assert!(matches!(to_second[1], ServerEvent::StateSync(_)));

        let to_first = drain(&mut first);
        assert_eq!(to_first.len(), 1);
        assert!(matches!(to_first[0], ServerEvent::PresenceChanged(_)));
    }

    #[tokio::test]
    async fn second_attach_is_rejected() {
        let engine = engine();
        let conn = attached(&engine, "u1", "alice").await;

        let err = engine
            .attach(conn.id, UserId::new("u1"), "alice".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::AlreadyAttached(conn.id));
        assert_eq!(engine.presence().count().await, 1);
    }

    #[tokio::test]
    async fn attach_after_detach_is_rejected() {
        let engine = engine();
        let mut alice = attached(&engine, "u1", "alice").await;
        let bob = attached(&engine, "u2", "bob").await;
        engine.detach(bob.id).await;
        drain(&mut alice);

        let err = engine
            .attach(bob.id, UserId::new("u2"), "bob".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::ConnectionClosed(bob.id));
        assert_eq!(engine.presence().count().await, 1);
        assert!(drain(&mut alice).is_empty());
    }

    #[tokio::test]
    async fn attach_on_unknown_connection_is_rejected() {
        let engine = engine();
        let mut alice = attached(&engine, "u1", "alice").await;
        drain(&mut alice);

        let stranger = ConnectionId::new();
        let err = engine
            .attach(stranger, UserId::new("u9"), "mallory".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONNECTION_CLOSED");
        assert!(engine.presence().find_by_connection(stranger).await.is_none());
        assert_eq!(engine.presence().count().await, 1);
        assert!(drain(&mut alice).is_empty());
    }

    #[tokio::test]
    async fn attach_requires_names() {
        let engine = engine();
        let conn = engine.open().await;
        let err = engine
            .attach(conn.id, UserId::new("u1"), "   ".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_MESSAGE");
    }

    #[tokio::test]
    async fn mutation_from_unattached_connection_is_rejected() {
        let engine = engine();
        let mut conn = engine.open().await;

        engine
            .handle_text(
                conn.id,
                r#"{"type":"ADD_TO_CART","payload":{"productId":"p1","quantity":1,"userId":"u1"}}"#,
            )
            .await;

        let events = drain(&mut conn);
        assert_eq!(events.len(), 1);
        let ServerEvent::ErrorNotice(notice) = &events[0] else {
            panic!("expected error notice");
        };
        assert_eq!(notice.code, "NOT_ATTACHED");
        assert!(engine.cart().snapshot().await.is_empty());
        assert!(engine.audit().is_empty().await);
    }

    #[tokio::test]
    async fn failed_mutation_only_reaches_requester() {
        let engine = engine();
        let mut alice = attached(&engine, "u1", "alice").await;
        let mut bob = attached(&engine, "u2", "bob").await;
        drain(&mut alice);
        drain(&mut bob);

        let err = engine
            .mutate(alice.id, CartMutation::add("unknown", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Cart(CartError::ProductNotFound { .. })
        ));

        engine
            .handle(
                alice.id,
                ClientEvent::parse(
                    r#"{"type":"REMOVE_FROM_CART","payload":{"productId":"p1","userId":"u1"}}"#,
                )
                .unwrap(),
            )
            .await;

        let to_alice = drain(&mut alice);
        assert_eq!(to_alice.len(), 1);
        assert!(matches!(&to_alice[0], ServerEvent::ErrorNotice(n) if n.code == "ITEM_NOT_FOUND"));
        assert!(drain(&mut bob).is_empty());
        assert!(engine.audit().is_empty().await);
    }

    #[tokio::test]
    async fn acting_user_comes_from_presence_not_payload() {
        let engine = engine();
        let _alice = attached(&engine, "u1", "alice").await;
        let mallory = attached(&engine, "u9", "mallory").await;

        engine
            .handle_text(
                mallory.id,
                r#"{"type":"ADD_TO_CART","payload":{"productId":"p2","quantity":1,"userId":"u1"}}"#,
            )
            .await;

        let state = engine.cart().snapshot().await;
        assert_eq!(state.last_modified_by().unwrap().as_str(), "u9");
        let entries = engine.audit().recent(1).await;
        assert_eq!(entries[0].user_id.as_str(), "u9");
    }

    #[tokio::test]
    async fn non_numeric_quantity_is_rejected() {
        let engine = engine();
        let mut conn = attached(&engine, "u1", "alice").await;
        drain(&mut conn);

        engine
            .handle_text(
                conn.id,
                r#"{"type":"ADD_TO_CART","payload":{"productId":"p1","quantity":"lots"}}"#,
            )
            .await;

        let events = drain(&mut conn);
        assert!(matches!(&events[0], ServerEvent::ErrorNotice(n) if n.code == "INVALID_QUANTITY"));
    }

    #[tokio::test]
    async fn set_quantity_zero_announces_removal() {
        let engine = engine();
        let mut conn = attached(&engine, "u1", "alice").await;
        engine
            .mutate(conn.id, CartMutation::add("p3", 2))
            .await
            .unwrap();
        drain(&mut conn);

        let change = engine
            .mutate(conn.id, CartMutation::set_quantity("p3", 0))
            .await
            .unwrap();
        assert!(change.state.is_empty());

        let events = drain(&mut conn);
        let ServerEvent::OperationNotice(notice) = &events[1] else {
            panic!("expected notice after state sync");
        };
        assert_eq!(notice.operation_kind, OperationKind::Remove);
        assert_eq!(notice.message, "alice removed AirPods Pro from the cart");
        assert_eq!(
            engine.audit().recent(1).await[0].operation,
            OperationKind::Remove
        );
    }

    #[tokio::test]
    async fn detach_broadcasts_to_remaining_connections() {
        let engine = engine();
        let mut alice = attached(&engine, "u1", "alice").await;
        let mut bob = attached(&engine, "u2", "bob").await;
        drain(&mut alice);
        drain(&mut bob);

        let removed = engine.detach(bob.id).await.unwrap();
        assert_eq!(removed.username, "bob");

        let to_alice = drain(&mut alice);
        let ServerEvent::PresenceChanged(presence) = &to_alice[0] else {
            panic!("expected presence update");
        };
        assert_eq!(presence.count, 1);
        assert_eq!(presence.all_users[0].user_id.as_str(), "u1");
        assert!(bob.outbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn detach_without_attach_is_a_no_op() {
        let engine = engine();
        let mut alice = attached(&engine, "u1", "alice").await;
        drain(&mut alice);

        let lurker = engine.open().await;
        assert!(engine.detach(lurker.id).await.is_none());
        assert!(engine.detach(lurker.id).await.is_none());
        assert!(drain(&mut alice).is_empty());
    }

    #[tokio::test]
    async fn unattached_connections_do_not_receive_broadcasts() {
        let engine = engine();
        let alice = attached(&engine, "u1", "alice").await;
        let mut lurker = engine.open().await;

        engine
            .mutate(alice.id, CartMutation::add(ProductId::new("p1"), 1))
            .await
            .unwrap();

        assert!(drain(&mut lurker).is_empty());
    }
}
