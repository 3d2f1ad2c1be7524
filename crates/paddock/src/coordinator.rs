//! The process-wide coordinator.
//!
//! `Coordinator` owns the session manager and the lobby registry and is the
//! only thing that mutates them. It is synchronous: every entry point runs
//! to completion without awaiting, and output goes onto the per-connection
//! queues in [`ConnectionHandle`]. The server wraps it in one mutex, so
//! every frame, open, and close is applied atomically with respect to all
//! other connections.
//!
//! ```text
//! open()          capacity check
//! handle_frame()  Unauthenticated → handshake()   (handshake.rs)
//!                 Identified      → route()       (router.rs)
//! close()         unbind, drop abandoned lobbies, broadcast
//! ```

use paddock_lobby::{LobbyConfig, LobbyRegistry};
use paddock_protocol::{ClientId, CloseCode, Codec, JsonCodec, ServerMessage};
use paddock_session::{ConnectionHandle, SessionConfig, SessionManager, SessionState};
use paddock_transport::ConnectionId;

use crate::router::Router;

/// What the connection task should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading frames.
    Continue,
    /// A close has been queued; stop reading and drain the queue.
    Close,
}

/// Owns all shared state: identities, connections, and lobbies.
pub struct Coordinator {
    pub(crate) sessions: SessionManager,
    pub(crate) lobbies: LobbyRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) router: Router,
}

impl Coordinator {
    pub fn new(sessions: SessionConfig, lobbies: LobbyConfig) -> Self {
        Self {
            sessions: SessionManager::new(sessions),
            lobbies: LobbyRegistry::new(lobbies),
            codec: JsonCodec,
            router: Router::new(),
        }
    }

    /// Admission check for a freshly accepted connection.
    ///
    /// Over the ceiling, a capacity close is queued before any identity
    /// is issued.
    pub fn open(&self, handle: &ConnectionHandle) -> Flow {
        if self.sessions.try_admit() {
            tracing::debug!(conn_id = %handle.id(), "connection admitted");
            return Flow::Continue;
        }

        tracing::warn!(
            conn_id = %handle.id(),
            live = self.sessions.live(),
            max = self.sessions.max_connections(),
            "rejecting connection: server full"
        );
        handle.close(CloseCode::CapacityExceeded);
        Flow::Close
    }

    /// Processes one inbound frame from `handle`.
    ///
    /// `state` is the connection's own handshake state; it moves to
    /// `Identified` when a connect or reconnect succeeds.
    pub fn handle_frame(
        &mut self,
        handle: &ConnectionHandle,
        state: &mut SessionState,
        data: &[u8],
    ) -> Flow {
        let Some(client) = state.client().cloned() else {
            return self.handshake(handle, state, data);
        };

        // A reconnect elsewhere took this identity; the close is already
        // queued, so anything still in flight is dropped.
        if self.sessions.client_for(handle.id()) != Some(&client) {
            tracing::debug!(
                conn_id = %handle.id(),
                client_id = %client,
                "ignoring frame from superseded connection"
            );
            return Flow::Close;
        }
        self.route(handle, &client, data)
    }

    /// Cleans up after a connection has gone away.
    ///
    /// Unbinds it and deletes every lobby of its identity that no longer
    /// has a member with a live connection. Lobbies with someone still
    /// connected keep all memberships so a reconnect can resume them.
    pub fn close(&mut self, conn: ConnectionId) {
        let Some(client) = self.sessions.disconnect(conn) else {
            tracing::debug!(conn_id = %conn, "unbound connection closed");
            return;
        };

        let sessions = &self.sessions;
        let removed = self
            .lobbies
            .remove_abandoned(&client, |member| sessions.connection_for(member).is_some());
        if !removed.is_empty() {
            tracing::info!(
                client_id = %client,
                lobbies = removed.len(),
                "removed lobbies abandoned on disconnect"
            );
            self.broadcast_lobby_list();
        }
    }

    /// Number of connections bound to an identity.
    pub fn live_connections(&self) -> usize {
        self.sessions.live()
    }

    /// Number of live lobbies.
    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    /// Whether `client` may reconnect.
    pub fn is_verified(&self, client: &ClientId) -> bool {
        self.sessions.is_verified(client)
    }

    /// Encodes `message` and queues it on `handle`.
    pub(crate) fn reply(&self, handle: &ConnectionHandle, message: &ServerMessage) {
        match self.codec.encode(message) {
            Ok(bytes) => {
                if !handle.send(bytes) {
                    tracing::debug!(conn_id = %handle.id(), "reply dropped: connection gone");
                }
            }
            Err(e) => {
                tracing::error!(conn_id = %handle.id(), error = %e, "failed to encode reply");
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(SessionConfig::default(), LobbyConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
