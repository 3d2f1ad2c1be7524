//! The session manager: identity issuance, verification, and reattachment.
//!
//! # Concurrency note
//!
//! `SessionManager` is not thread-safe by itself. It is owned by the
//! server's coordinator, which sits behind a single mutex; every method
//! here runs to completion without yielding.

use std::collections::HashSet;

use paddock_protocol::ClientId;
use paddock_transport::ConnectionId;

use crate::{
    ConnectionHandle, ConnectionRegistry, IdentityIssuer, SessionConfig, SessionError,
};

/// The outcome of a successful reconnect.
#[derive(Debug)]
pub struct Reattached {
    /// The identity now bound to the new connection.
    pub client: ClientId,
    /// The connection that carried this identity before, if it was still
    /// bound. The caller should close it.
    pub superseded: Option<ConnectionHandle>,
}

/// Tracks every identity the server has issued and which connection each
/// one is currently on.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ [bound] ──→ disconnect() ──→ [verified, unbound]
///                  ▲                               │
///                  └────────── reconnect() ────────┘
/// ```
///
/// Identities are never revoked: once verified, an identity can reconnect
/// for the lifetime of the process.
#[derive(Debug)]
pub struct SessionManager {
    issuer: IdentityIssuer,

    /// Every identity that completed a connect.
    verified: HashSet<ClientId>,

    connections: ConnectionRegistry,
}

impl SessionManager {
    /// Creates an empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            issuer: IdentityIssuer,
            verified: HashSet::new(),
            connections: ConnectionRegistry::new(config.max_connections),
        }
    }

    /// Whether a new connection fits under the ceiling.
    pub fn try_admit(&self) -> bool {
        self.connections.try_admit()
    }

    /// Issues a new identity and binds it to `handle`.
    ///
    /// # Errors
    /// [`SessionError::CapacityExceeded`] if the ceiling was reached while
    /// this connection was still unauthenticated. No identity is issued.
    pub fn connect(&mut self, handle: ConnectionHandle) -> Result<ClientId, SessionError> {
        if !self.connections.try_admit() {
            return Err(SessionError::CapacityExceeded {
                max: self.connections.max_connections(),
            });
        }

        let client = loop {
            let candidate: ClientId = self.issuer.issue();
            if !self.verified.contains(&candidate) {
                break candidate;
            }
        };

        let conn_id = handle.id();
        self.connections.bind(client.clone(), handle);
        self.verified.insert(client.clone());

        tracing::info!(
            client_id = %client,
            %conn_id,
            live = self.connections.len(),
            max = self.connections.max_connections(),
            "client connected"
        );
        Ok(client)
    }

    /// Reattaches a previously issued identity to `handle`.
    ///
    /// If the identity is still bound to an older connection, that
    /// connection is superseded and returned in [`Reattached`].
    ///
    /// # Errors
    /// - [`SessionError::UnknownIdentity`]: the identity never connected
    /// - [`SessionError::CapacityExceeded`]: the identity is not currently
    ///   bound and the ceiling has been reached
    pub fn reconnect(
        &mut self,
        client: ClientId,
        handle: ConnectionHandle,
    ) -> Result<Reattached, SessionError> {
        if !self.verified.contains(&client) {
            return Err(SessionError::UnknownIdentity(client));
        }

        // Superseding swaps one binding for another, so only a fresh
        // binding counts against the ceiling.
        if self.connections.connection_for(&client).is_none() && !self.connections.try_admit() {
            return Err(SessionError::CapacityExceeded {
                max: self.connections.max_connections(),
            });
        }

        let conn_id = handle.id();
        let superseded = self.connections.bind(client.clone(), handle);

        tracing::info!(
            client_id = %client,
            %conn_id,
            superseded = ?superseded.as_ref().map(ConnectionHandle::id),
            live = self.connections.len(),
            max = self.connections.max_connections(),
            "client reconnected"
        );
        Ok(Reattached { client, superseded })
    }

    /// Unbinds a closing connection.
    ///
    /// Returns the identity it carried. The identity stays verified.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<ClientId> {
        let client = self.connections.unbind(conn)?;
        tracing::info!(
            client_id = %client,
            conn_id = %conn,
            live = self.connections.len(),
            max = self.connections.max_connections(),
            "client disconnected"
        );
        Some(client)
    }

    /// Whether `client` has completed at least one connect.
    pub fn is_verified(&self, client: &ClientId) -> bool {
        self.verified.contains(client)
    }

    /// The identity currently bound to `conn`.
    pub fn client_for(&self, conn: ConnectionId) -> Option<&ClientId> {
        self.connections.client_for(conn)
    }

    /// The connection currently bound to `client`.
    pub fn connection_for(&self, client: &ClientId) -> Option<&ConnectionHandle> {
        self.connections.connection_for(client)
    }

    /// Every bound connection.
    pub fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.connections.handles()
    }

    /// Number of bound connections.
    pub fn live(&self) -> usize {
        self.connections.len()
    }

    pub fn max_connections(&self) -> usize {
        self.connections.max_connections()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Handles are created without a connection task behind them; the
    //! receivers are dropped, which the manager never notices.

    use super::*;

    fn manager(max: usize) -> SessionManager {
        SessionManager::new(SessionConfig {
            max_connections: max,
        })
    }

    fn handle(id: u64) -> ConnectionHandle {
        ConnectionHandle::new(ConnectionId::new(id)).0
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[test]
    fn test_connect_issues_verified_identity_and_binds() {
        let mut mgr = manager(10);
        let client = mgr.connect(handle(1)).unwrap();

        assert!(mgr.is_verified(&client));
        assert_eq!(mgr.client_for(ConnectionId::new(1)), Some(&client));
        assert_eq!(mgr.live(), 1);
    }

    #[test]
    fn test_connect_twice_issues_distinct_identities() {
        let mut mgr = manager(10);
        let a = mgr.connect(handle(1)).unwrap();
        let b = mgr.connect(handle(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_connect_at_ceiling_returns_capacity_exceeded() {
        let mut mgr = manager(1);
        mgr.connect(handle(1)).unwrap();

        let result = mgr.connect(handle(2));
        assert!(matches!(result, Err(SessionError::CapacityExceeded { max: 1 })));
        assert_eq!(mgr.live(), 1);
    }

    // =====================================================================
    // reconnect()
    // =====================================================================

    #[test]
    fn test_reconnect_unknown_identity_returns_error() {
        let mut mgr = manager(10);
        let result = mgr.reconnect(ClientId::from("never-issued"), handle(1));

        assert!(matches!(result, Err(SessionError::UnknownIdentity(_))));
        assert_eq!(mgr.live(), 0, "no state may be created for it");
        assert!(!mgr.is_verified(&ClientId::from("never-issued")));
    }

    #[test]
    fn test_reconnect_after_disconnect_rebinds() {
        let mut mgr = manager(10);
        let client = mgr.connect(handle(1)).unwrap();
        mgr.disconnect(ConnectionId::new(1));

        let reattached = mgr.reconnect(client.clone(), handle(2)).unwrap();

        assert_eq!(reattached.client, client);
        assert!(reattached.superseded.is_none());
        assert_eq!(mgr.client_for(ConnectionId::new(2)), Some(&client));
    }

    #[test]
    fn test_reconnect_while_bound_supersedes_old_connection() {
        let mut mgr = manager(10);
        let client = mgr.connect(handle(1)).unwrap();

        let reattached = mgr.reconnect(client.clone(), handle(2)).unwrap();

        assert_eq!(
            reattached.superseded.map(|h| h.id()),
            Some(ConnectionId::new(1))
        );
        assert_eq!(mgr.client_for(ConnectionId::new(1)), None);
        assert_eq!(mgr.live(), 1);
    }

    #[test]
    fn test_reconnect_supersede_allowed_at_ceiling() {
        let mut mgr = manager(1);
        let client = mgr.connect(handle(1)).unwrap();

        assert!(mgr.reconnect(client, handle(2)).is_ok());
    }

    #[test]
    fn test_reconnect_unbound_at_ceiling_returns_capacity_exceeded() {
        let mut mgr = manager(1);
        let a = mgr.connect(handle(1)).unwrap();
        mgr.disconnect(ConnectionId::new(1));
        mgr.connect(handle(2)).unwrap();

        let result = mgr.reconnect(a, handle(3));
        assert!(matches!(result, Err(SessionError::CapacityExceeded { .. })));
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_keeps_identity_verified() {
        let mut mgr = manager(10);
        let client = mgr.connect(handle(1)).unwrap();

        assert_eq!(mgr.disconnect(ConnectionId::new(1)), Some(client.clone()));
        assert!(mgr.is_verified(&client));
        assert_eq!(mgr.live(), 0);
    }

    #[test]
    fn test_disconnect_unbound_connection_returns_none() {
        let mut mgr = manager(10);
        assert_eq!(mgr.disconnect(ConnectionId::new(5)), None);
    }

    #[test]
    fn test_disconnect_superseded_connection_returns_none() {
        let mut mgr = manager(10);
        let client = mgr.connect(handle(1)).unwrap();
        mgr.reconnect(client.clone(), handle(2)).unwrap();

        assert_eq!(mgr.disconnect(ConnectionId::new(1)), None);
        assert_eq!(mgr.client_for(ConnectionId::new(2)), Some(&client));
    }

    // =====================================================================
    // Full lifecycle
    // =====================================================================

    #[test]
    fn test_full_lifecycle_connect_disconnect_reconnect() {
        let mut mgr = manager(2);
        let a = mgr.connect(handle(1)).unwrap();
        let b = mgr.connect(handle(2)).unwrap();
        assert!(!mgr.try_admit());

        mgr.disconnect(ConnectionId::new(1));
        assert!(mgr.try_admit());

        mgr.reconnect(a.clone(), handle(3)).unwrap();
        assert!(!mgr.try_admit());
        assert_eq!(mgr.connection_for(&a).map(|h| h.id()), Some(ConnectionId::new(3)));
        assert_eq!(mgr.connection_for(&b).map(|h| h.id()), Some(ConnectionId::new(2)));
    }
}
