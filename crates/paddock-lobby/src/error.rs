//! Error types for the lobby layer.

use paddock_protocol::{ClientId, LobbyId};

/// Errors that can occur during lobby operations.
///
/// All of them are recoverable: the client gets a failure response and
/// the connection stays open.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LobbyError {
    /// The lobby does not exist (never did, or was deleted when empty).
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// The lobby is at capacity.
    #[error("lobby {0} is full")]
    Full(LobbyId),

    /// The client is not a member of this lobby.
    #[error("client {0} not in lobby {1}")]
    NotAMember(ClientId, LobbyId),

    /// The client is already a member of this lobby.
    #[error("client {0} already in lobby {1}")]
    AlreadyMember(ClientId, LobbyId),
}

impl LobbyError {
    /// The short message sent to the client in a failure response.
    pub fn client_message(&self) -> &'static str {
        match self {
            LobbyError::NotFound(_) => "Lobby not found",
            LobbyError::Full(_) => "Lobby full",
            LobbyError::NotAMember(..) => "Player not in lobby",
            LobbyError::AlreadyMember(..) => "Player already in lobby",
        }
    }
}
