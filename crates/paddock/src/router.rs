//! Message routing for identified connections.
//!
//! The dispatch table maps every [`Protocol`] kind to a plain function
//! pointer and is built once, when the coordinator is created. Routing a
//! frame is:
//!
//! 1. read the envelope; garbage closes the connection (1003)
//! 2. look up the kind; an unknown kind gets a failure echoing its tag
//!    and the connection stays open
//! 3. parse the body; a bad body closes the connection (1003)
//! 4. run the handler, reply to the sender, and broadcast if lobby
//!    membership changed
//!
//! Every request gets exactly one reply, carrying the request's
//! `requestId` when it had one.

use std::collections::HashMap;

use paddock_lobby::LobbyError;
use paddock_protocol::{
    ClientId, ClientMessage, CloseCode, Protocol, ProtocolTag, RawFrame, ServerMessage,
};
use paddock_session::ConnectionHandle;

use crate::coordinator::{Coordinator, Flow};

/// Why a handler could not serve a request.
///
/// None of these close the connection.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The kind is recognised but has no server-side behaviour yet.
    #[error("{0} is not implemented")]
    Unimplemented(Protocol),

    /// A handshake kind arrived on a connection that already has an
    /// identity.
    #[error("client {0} is already identified")]
    AlreadyIdentified(ClientId),

    /// A handler fault. Logged; the client only sees a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouteError {
    /// The `error` string sent to the client.
    pub fn client_message(&self) -> &'static str {
        match self {
            RouteError::Lobby(e) => e.client_message(),
            RouteError::Unimplemented(_) => "Not yet implemented",
            RouteError::AlreadyIdentified(_) => "Already identified",
            RouteError::Internal(_) => "Internal server error",
        }
    }
}

/// A parsed request from an identified connection.
pub(crate) struct Request<'a> {
    pub handle: &'a ConnectionHandle,
    pub client: &'a ClientId,
    pub message: ClientMessage,
}

/// A handler's successful result.
pub(crate) struct Routed {
    pub response: ServerMessage,
    /// Lobby membership changed; everyone gets the new list.
    pub broadcast: bool,
}

impl Routed {
    fn reply(response: ServerMessage) -> Self {
        Self {
            response,
            broadcast: false,
        }
    }

    fn changed(response: ServerMessage) -> Self {
        Self {
            response,
            broadcast: true,
        }
    }
}

pub(crate) type Handler = fn(&mut Coordinator, &Request<'_>) -> Result<Routed, RouteError>;

/// The dispatch table.
pub(crate) struct Router {
    routes: HashMap<Protocol, Handler>,
}

impl Router {
    pub(crate) fn new() -> Self {
        let mut routes: HashMap<Protocol, Handler> = HashMap::new();
        routes.insert(Protocol::Connect, already_identified);
        routes.insert(Protocol::Reconnect, already_identified);
        routes.insert(Protocol::GetLobbyList, get_lobby_list);
        routes.insert(Protocol::CreateLobby, create_lobby);
        routes.insert(Protocol::JoinLobby, join_lobby);
        routes.insert(Protocol::LeaveLobby, leave_lobby);
        routes.insert(Protocol::StartGame, start_game);
        Self { routes }
    }

    pub(crate) fn get(&self, kind: Protocol) -> Option<Handler> {
        self.routes.get(&kind).copied()
    }
}

impl Coordinator {
    /// Routes one frame from an identified connection.
    pub(crate) fn route(
        &mut self,
        handle: &ConnectionHandle,
        client: &ClientId,
        data: &[u8],
    ) -> Flow {
        let frame = match RawFrame::decode(&self.codec, data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(conn_id = %handle.id(), client_id = %client, error = %e, "malformed frame");
                handle.close(CloseCode::MalformedFrame);
                return Flow::Close;
            }
        };
        let request_id = frame.request_id;

        let Some((kind, handler)) = frame
            .kind()
            .ok()
            .and_then(|kind| self.router.get(kind).map(|handler| (kind, handler)))
        else {
            tracing::debug!(client_id = %client, protocol = %frame.protocol, "unknown protocol");
            self.reply(
                handle,
                &ServerMessage::failure(ProtocolTag::Unknown(frame.protocol), "Unknown protocol")
                    .with_request_id(request_id),
            );
            return Flow::Continue;
        };

        let message = match frame.into_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(client_id = %client, protocol = %kind, error = %e, "invalid message");
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, "Invalid message").with_request_id(request_id),
                );
                handle.close(CloseCode::MalformedFrame);
                return Flow::Close;
            }
        };

        tracing::debug!(client_id = %client, protocol = %kind, "routing");
        let request = Request {
            handle,
            client,
            message,
        };

        match handler(self, &request) {
            Ok(Routed {
                response,
                broadcast,
            }) => {
                self.reply(handle, &response.with_request_id(request_id));
                if broadcast {
                    self.broadcast_lobby_list();
                }
            }
            Err(RouteError::Internal(e)) => {
                tracing::error!(client_id = %client, protocol = %kind, error = %e, "handler failed");
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, "Internal server error").with_request_id(request_id),
                );
            }
            Err(e) => {
                tracing::debug!(client_id = %client, protocol = %kind, error = %e, "request failed");
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, e.client_message()).with_request_id(request_id),
                );
            }
        }
        Flow::Continue
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn already_identified(_: &mut Coordinator, req: &Request<'_>) -> Result<Routed, RouteError> {
    Err(RouteError::AlreadyIdentified(req.client.clone()))
}

fn get_lobby_list(coord: &mut Coordinator, _: &Request<'_>) -> Result<Routed, RouteError> {
    Ok(Routed::reply(ServerMessage::lobby_list(coord.lobbies.list())))
}

fn create_lobby(coord: &mut Coordinator, req: &Request<'_>) -> Result<Routed, RouteError> {
    let lobby_id = coord.lobbies.create(req.client.clone(), req.handle.id());
    Ok(Routed::changed(
        ServerMessage::success(Protocol::CreateLobby).with_id(lobby_id),
    ))
}

fn join_lobby(coord: &mut Coordinator, req: &Request<'_>) -> Result<Routed, RouteError> {
    let ClientMessage::JoinLobby { id } = &req.message else {
        return Err(mismatch(Protocol::JoinLobby, &req.message));
    };
    let lobby_id = coord.lobbies.join(id, req.client.clone(), req.handle.id())?;
    Ok(Routed::changed(
        ServerMessage::success(Protocol::JoinLobby).with_id(lobby_id),
    ))
}

fn leave_lobby(coord: &mut Coordinator, req: &Request<'_>) -> Result<Routed, RouteError> {
    let ClientMessage::LeaveLobby { id } = &req.message else {
        return Err(mismatch(Protocol::LeaveLobby, &req.message));
    };
    coord.lobbies.leave(id, req.client)?;
    Ok(Routed::changed(ServerMessage::success(Protocol::LeaveLobby)))
}

fn start_game(_: &mut Coordinator, _: &Request<'_>) -> Result<Routed, RouteError> {
    Err(RouteError::Unimplemented(Protocol::StartGame))
}

fn mismatch(expected: Protocol, got: &ClientMessage) -> RouteError {
    RouteError::Internal(format!(
        "{expected} handler dispatched a {} message",
        got.protocol()
    ))
}
