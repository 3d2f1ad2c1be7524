//! Unified error type for Paddock.

use paddock_lobby::LobbyError;
use paddock_protocol::ProtocolError;
use paddock_session::SessionError;
use paddock_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PaddockError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown identity, capacity).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (not found, full, not a member).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Reading the local address of the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use paddock_protocol::{ClientId, LobbyId};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let paddock_err: PaddockError = err.into();
        assert!(matches!(paddock_err, PaddockError::Transport(_)));
        assert!(paddock_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let paddock_err: PaddockError = err.into();
        assert!(matches!(paddock_err, PaddockError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UnknownIdentity(ClientId::from("ghost"));
        let paddock_err: PaddockError = err.into();
        assert!(matches!(paddock_err, PaddockError::Session(_)));
        assert!(paddock_err.to_string().contains("ghost"));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::Full(LobbyId::from("l1"));
        let paddock_err: PaddockError = err.into();
        assert!(matches!(paddock_err, PaddockError::Lobby(_)));
    }
}
