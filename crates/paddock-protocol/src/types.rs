//! Core protocol types for Paddock's wire format.
//!
//! Every frame in either direction is a JSON object with a `protocol`
//! discriminator. Client frames carry kind-specific fields next to it;
//! server frames add `success` plus either a payload (`id`, `lobbyList`)
//! or an `error` string.
//!
//! ```text
//! → {"protocol":"JOIN_LOBBY","id":"5f0c…","requestId":7}
//! ← {"protocol":"JOIN_LOBBY","success":true,"id":"5f0c…","requestId":7}
//! ← {"protocol":"GET_LOBBY_LIST","success":true,"lobbyList":[…]}
//! ```

use std::fmt;
use std::str::FromStr;

use paddock_transport::CloseReason;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The opaque identity of a client.
///
/// Issued once on `CONNECT` and presented again on `RECONNECT`; it is the
/// only thing that survives when the underlying socket changes. On the wire
/// it is a plain JSON string (`#[serde(transparent)]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Borrows the raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity of a lobby. Same shape as [`ClientId`], different type so
/// the two can't be mixed up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(String);

impl LobbyId {
    /// Borrows the raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LobbyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for LobbyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Protocol: the message kind discriminator
// ---------------------------------------------------------------------------

/// Every message kind the server understands.
///
/// Serialized in SCREAMING_SNAKE_CASE, so `Protocol::GetLobbyList`
/// becomes `"GET_LOBBY_LIST"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    Connect,
    Reconnect,
    GetLobbyList,
    CreateLobby,
    JoinLobby,
    LeaveLobby,
    StartGame,
}

impl Protocol {
    /// All kinds, in declaration order.
    pub const ALL: [Protocol; 7] = [
        Protocol::Connect,
        Protocol::Reconnect,
        Protocol::GetLobbyList,
        Protocol::CreateLobby,
        Protocol::JoinLobby,
        Protocol::LeaveLobby,
        Protocol::StartGame,
    ];

    /// The wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Connect => "CONNECT",
            Protocol::Reconnect => "RECONNECT",
            Protocol::GetLobbyList => "GET_LOBBY_LIST",
            Protocol::CreateLobby => "CREATE_LOBBY",
            Protocol::JoinLobby => "JOIN_LOBBY",
            Protocol::LeaveLobby => "LEAVE_LOBBY",
            Protocol::StartGame => "START_GAME",
        }
    }

    /// Whether this kind establishes identity (`CONNECT` / `RECONNECT`).
    pub fn is_handshake(self) -> bool {
        matches!(self, Protocol::Connect | Protocol::Reconnect)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownProtocol(s.to_owned()))
    }
}

/// The `protocol` field of a server frame.
///
/// Usually a known [`Protocol`], but a failure response to an unknown kind
/// echoes back whatever discriminator the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolTag {
    Known(Protocol),
    Unknown(String),
}

impl From<Protocol> for ProtocolTag {
    fn from(p: Protocol) -> Self {
        ProtocolTag::Known(p)
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolTag::Known(p) => f.write_str(p.as_str()),
            ProtocolTag::Unknown(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientMessage: client → server
// ---------------------------------------------------------------------------

/// A well-typed client frame.
///
/// Internally tagged on `protocol`: `ClientMessage::JoinLobby { id }`
/// is `{"protocol":"JOIN_LOBBY","id":"…"}` on the wire. Extra fields
/// (such as `requestId`) are ignored here; see [`crate::RawFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Ask for a fresh identity.
    Connect,
    /// Reattach a previously issued identity to this connection.
    Reconnect { id: ClientId },
    GetLobbyList,
    CreateLobby,
    JoinLobby { id: LobbyId },
    LeaveLobby { id: LobbyId },
    StartGame,
}

impl ClientMessage {
    /// The kind of this message, used as the dispatch key.
    pub fn protocol(&self) -> Protocol {
        match self {
            ClientMessage::Connect => Protocol::Connect,
            ClientMessage::Reconnect { .. } => Protocol::Reconnect,
            ClientMessage::GetLobbyList => Protocol::GetLobbyList,
            ClientMessage::CreateLobby => Protocol::CreateLobby,
            ClientMessage::JoinLobby { .. } => Protocol::JoinLobby,
            ClientMessage::LeaveLobby { .. } => Protocol::LeaveLobby,
            ClientMessage::StartGame => Protocol::StartGame,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: server → client
// ---------------------------------------------------------------------------

/// The externally visible projection of one lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub id: LobbyId,
    pub player_count: usize,
    pub max_players: usize,
}

/// A server frame: either a response to one request or a broadcast.
///
/// Optional fields are left out of the JSON entirely when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub protocol: ProtocolTag,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lobby_list: Option<Vec<LobbySummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Echo of the client's `requestId`. Never set on broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl ServerMessage {
    /// A bare success response.
    pub fn success(protocol: Protocol) -> Self {
        Self {
            protocol: protocol.into(),
            success: true,
            id: None,
            lobby_list: None,
            error: None,
            request_id: None,
        }
    }

    /// A failure response carrying a human-readable error.
    pub fn failure(protocol: impl Into<ProtocolTag>, error: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            success: false,
            id: None,
            lobby_list: None,
            error: Some(error.into()),
            request_id: None,
        }
    }

    /// The lobby list, as sent both in reply to `GET_LOBBY_LIST` and as
    /// the broadcast after every membership change.
    pub fn lobby_list(lobbies: Vec<LobbySummary>) -> Self {
        Self {
            lobby_list: Some(lobbies),
            ..Self::success(Protocol::GetLobbyList)
        }
    }

    /// Attaches an `id` payload (a client or lobby identity).
    pub fn with_id(mut self, id: impl fmt::Display) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Attaches the correlation id of the request being answered.
    pub fn with_request_id(mut self, request_id: Option<u64>) -> Self {
        self.request_id = request_id;
        self
    }
}

// ---------------------------------------------------------------------------
// Close codes
// ---------------------------------------------------------------------------

/// Close codes the server sends when it ends a connection.
///
/// The first three are from the RFC 6455 range and match what browser
/// clients already expect; the `4xxx` ones are application-private.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// The live-connection ceiling was reached.
    CapacityExceeded,
    /// The frame could not be parsed as a message.
    MalformedFrame,
    /// The peer broke the handshake rules.
    ProtocolViolation,
    /// No frame arrived within the configured idle timeout.
    IdleTimeout,
    /// A reconnect attached this connection's identity to a newer socket.
    Superseded,
}

impl CloseCode {
    /// The numeric code sent in the close frame.
    pub fn code(self) -> u16 {
        match self {
            CloseCode::CapacityExceeded => 1001,
            CloseCode::MalformedFrame => 1003,
            CloseCode::ProtocolViolation => 1008,
            CloseCode::IdleTimeout => 4000,
            CloseCode::Superseded => 4001,
        }
    }

    /// The default reason text for this code.
    pub fn reason(self) -> &'static str {
        match self {
            CloseCode::CapacityExceeded => "Server full",
            CloseCode::MalformedFrame => "Invalid message",
            CloseCode::ProtocolViolation => "Protocol violation",
            CloseCode::IdleTimeout => "Idle timeout",
            CloseCode::Superseded => "Superseded by a newer connection",
        }
    }

    /// Builds a close reason with a more specific message than the default.
    pub fn with_reason(self, reason: impl Into<String>) -> CloseReason {
        CloseReason::new(self.code(), reason)
    }
}

impl From<CloseCode> for CloseReason {
    fn from(code: CloseCode) -> Self {
        CloseReason::new(code.code(), code.reason())
    }
}

// =========================================================================
// Unit tests
// =========================================================================
