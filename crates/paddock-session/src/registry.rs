//! The connection registry: which identity is on which socket.
//!
//! The registry never touches sockets directly. Each live connection is
//! represented by a [`ConnectionHandle`], the sending half of an unbounded
//! channel whose receiving half is drained by that connection's task. That
//! keeps every registry operation synchronous: pushing a frame onto a
//! handle never waits on the network.

use std::collections::HashMap;
use std::sync::Arc;

use paddock_protocol::ClientId;
use paddock_transport::{CloseReason, ConnectionId};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ConnectionHandle
// ---------------------------------------------------------------------------

/// Something queued for delivery on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded frame. Shared so a broadcast encodes once.
    Frame(Arc<[u8]>),
    /// Close the connection after everything queued before it.
    Close(CloseReason),
}

/// The server's way to talk to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Creates a handle plus the receiver the connection task drains.
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    /// The connection this handle writes to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a frame. Returns `false` if the connection task is gone.
    pub fn send(&self, frame: impl Into<Arc<[u8]>>) -> bool {
        self.tx.send(Outbound::Frame(frame.into())).is_ok()
    }

    /// Queues a close. Frames queued earlier are still delivered first.
    pub fn close(&self, reason: impl Into<CloseReason>) -> bool {
        self.tx.send(Outbound::Close(reason.into())).is_ok()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Bidirectional map between client identities and live connections.
///
/// Invariant: `by_client` and `by_conn` always describe the same set of
/// pairings, so every identity has at most one live connection and every
/// connection at most one identity.
#[derive(Debug)]
pub struct ConnectionRegistry {
    max_connections: usize,
    by_client: HashMap<ClientId, ConnectionHandle>,
    by_conn: HashMap<ConnectionId, ClientId>,
}

impl ConnectionRegistry {
    /// Creates an empty registry with the given ceiling.
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            by_client: HashMap::new(),
            by_conn: HashMap::new(),
        }
    }

    /// Whether one more connection may be bound.
    pub fn try_admit(&self) -> bool {
        self.by_client.len() < self.max_connections
    }

    /// Pairs `client` with `handle`.
    ///
    /// Any connection previously bound to `client` is unpaired and
    /// returned so the caller can close it.
    pub fn bind(
        &mut self,
        client: ClientId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        // A connection carries one identity; drop a stale pairing first.
        if let Some(previous) = self.by_conn.remove(&handle.id()) {
            if previous != client {
                self.by_client.remove(&previous);
            }
        }

        self.by_conn.insert(handle.id(), client.clone());
        let superseded = self
            .by_client
            .insert(client, handle.clone())
            .filter(|old| old.id() != handle.id());

        if let Some(old) = &superseded {
            self.by_conn.remove(&old.id());
        }
        superseded
    }

    /// Removes the pairing for a closing connection.
    ///
    /// Returns the identity it carried, or `None` if the connection was
    /// never bound (or was already superseded).
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<ClientId> {
        let client = self.by_conn.remove(&conn)?;
        self.by_client.remove(&client);
        Some(client)
    }

    /// The identity bound to a connection.
    pub fn client_for(&self, conn: ConnectionId) -> Option<&ClientId> {
        self.by_conn.get(&conn)
    }

    /// The connection bound to an identity.
    pub fn connection_for(&self, client: &ClientId) -> Option<&ConnectionHandle> {
        self.by_client.get(client)
    }

    /// Every bound connection, in no particular order.
    pub fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.by_client.values()
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> ConnectionHandle {
        ConnectionHandle::new(ConnectionId::new(id)).0
    }

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    // =====================================================================
    // ConnectionHandle
    // =====================================================================

    #[test]
    fn test_handle_send_and_close_arrive_in_order() {
        let (h, mut rx) = ConnectionHandle::new(ConnectionId::new(1));
        assert!(h.send(b"one".to_vec()));
        assert!(h.close(CloseReason::new(1000, "bye")));

        assert_eq!(rx.try_recv().unwrap(), Outbound::Frame(Arc::from(&b"one"[..])));
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Close(CloseReason::new(1000, "bye"))
        );
    }

    #[test]
    fn test_handle_send_after_receiver_dropped_returns_false() {
        let (h, rx) = ConnectionHandle::new(ConnectionId::new(1));
        drop(rx);
        assert!(!h.send(b"lost".to_vec()));
    }

    // =====================================================================
    // Admission
    // =====================================================================

    #[test]
    fn test_try_admit_false_at_ceiling() {
        let mut reg = ConnectionRegistry::new(2);
        assert!(reg.try_admit());
        reg.bind(cid("a"), handle(1));
        reg.bind(cid("b"), handle(2));
        assert!(!reg.try_admit());
    }

    #[test]
    fn test_try_admit_true_again_after_unbind() {
        let mut reg = ConnectionRegistry::new(1);
        reg.bind(cid("a"), handle(1));
        assert!(!reg.try_admit());
        reg.unbind(ConnectionId::new(1));
        assert!(reg.try_admit());
    }

    #[test]
    fn test_try_admit_zero_max_never_admits() {
        let reg = ConnectionRegistry::new(0);
        assert!(!reg.try_admit());
    }

    // =====================================================================
    // Bind / lookup
    // =====================================================================

    #[test]
    fn test_bind_lookup_both_directions() {
        let mut reg = ConnectionRegistry::new(10);
        assert!(reg.bind(cid("a"), handle(1)).is_none());

        assert_eq!(reg.client_for(ConnectionId::new(1)), Some(&cid("a")));
        assert_eq!(
            reg.connection_for(&cid("a")).map(ConnectionHandle::id),
            Some(ConnectionId::new(1))
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_bind_same_client_new_connection_supersedes_old() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));

        let superseded = reg.bind(cid("a"), handle(2));

        assert_eq!(superseded.map(|h| h.id()), Some(ConnectionId::new(1)));
        assert_eq!(reg.client_for(ConnectionId::new(1)), None);
        assert_eq!(reg.client_for(ConnectionId::new(2)), Some(&cid("a")));
        assert_eq!(reg.len(), 1, "superseding must not change the count");
    }

    #[test]
    fn test_bind_same_pairing_twice_supersedes_nothing() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));
        assert!(reg.bind(cid("a"), handle(1)).is_none());
        assert_eq!(reg.len(), 1);
    }

    // =====================================================================
    // Unbind
    // =====================================================================

    #[test]
    fn test_unbind_returns_client_and_clears_both_maps() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));

        assert_eq!(reg.unbind(ConnectionId::new(1)), Some(cid("a")));
        assert!(reg.connection_for(&cid("a")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unbind_never_bound_is_noop() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));

        assert_eq!(reg.unbind(ConnectionId::new(99)), None);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unbind_superseded_connection_keeps_new_binding() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));
        reg.bind(cid("a"), handle(2));

        // The old socket finally closes; it must not evict the new one.
        assert_eq!(reg.unbind(ConnectionId::new(1)), None);
        assert_eq!(reg.client_for(ConnectionId::new(2)), Some(&cid("a")));
    }

    #[test]
    fn test_handles_lists_every_bound_connection() {
        let mut reg = ConnectionRegistry::new(10);
        reg.bind(cid("a"), handle(1));
        reg.bind(cid("b"), handle(2));

        let mut ids: Vec<_> = reg.handles().map(|h| h.id().into_inner()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }
}
