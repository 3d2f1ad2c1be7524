//! Per-connection session state and session configuration.

use paddock_protocol::ClientId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of connections bound to an identity at once.
    ///
    /// Default: 100.
    pub max_connections: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a single connection is in the handshake.
///
/// ```text
///                 CONNECT / RECONNECT ok
/// Unauthenticated ──────────────────────→ Identified(client)
///        │                                      │
///        └──────────── close ───────────────────┘
/// ```
///
/// Owned by the connection's task, not by the registry: the registry only
/// learns about a connection once it is identified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, waiting for the first frame.
    #[default]
    Unauthenticated,

    /// Bound to a client identity.
    Identified(ClientId),
}

impl SessionState {
    /// The bound identity, if any.
    pub fn client(&self) -> Option<&ClientId> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::Identified(client) => Some(client),
        }
    }

    /// Whether the handshake has completed.
    pub fn is_identified(&self) -> bool {
        matches!(self, SessionState::Identified(_))
    }
}
