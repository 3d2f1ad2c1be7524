//! Error types for the session layer.

use paddock_protocol::ClientId;

/// Errors that can occur while establishing a client's identity.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A reconnect presented an identity that never completed a connect.
    #[error("unknown client {0}")]
    UnknownIdentity(ClientId),

    /// Binding another connection would exceed the live-connection ceiling.
    #[error("server full ({max} connections)")]
    CapacityExceeded { max: usize },
}
