//! The handshake: a connection's first frame must establish identity.
//!
//! ```text
//! CONNECT            → new identity, bound, verified     → success + broadcast
//! RECONNECT{id}      → known id rebound to this socket   → success + broadcast
//! RECONNECT{unknown} → failure, close 1008
//! anything else      → failure, close 1008
//! unparseable        → close 1003
//! ```

use paddock_protocol::{
    ClientId, ClientMessage, CloseCode, Protocol, ProtocolTag, RawFrame, ServerMessage,
};
use paddock_session::{ConnectionHandle, Reattached, SessionError, SessionState};

use crate::coordinator::{Coordinator, Flow};

impl Coordinator {
    /// Handles a frame from a connection that has not identified yet.
    pub(crate) fn handshake(
        &mut self,
        handle: &ConnectionHandle,
        state: &mut SessionState,
        data: &[u8],
    ) -> Flow {
        let frame = match RawFrame::decode(&self.codec, data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(conn_id = %handle.id(), error = %e, "malformed handshake frame");
                handle.close(CloseCode::MalformedFrame);
                return Flow::Close;
            }
        };
        let request_id = frame.request_id;

        let kind = match frame.kind() {
            Ok(kind) if kind.is_handshake() => kind,
            Ok(kind) => return self.reject_unidentified(handle, kind.into(), request_id),
            Err(_) => {
                let tag = ProtocolTag::Unknown(frame.protocol.clone());
                return self.reject_unidentified(handle, tag, request_id);
            }
        };

        let message = match frame.into_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(conn_id = %handle.id(), error = %e, "malformed handshake frame");
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, "Invalid message").with_request_id(request_id),
                );
                handle.close(CloseCode::MalformedFrame);
                return Flow::Close;
            }
        };

        let outcome = match message {
            ClientMessage::Connect => self.sessions.connect(handle.clone()),
            ClientMessage::Reconnect { id } => self.reattach(handle, id),
            other => return self.reject_unidentified(handle, other.protocol().into(), request_id),
        };

        match outcome {
            Ok(client) => {
                self.reply(
                    handle,
                    &ServerMessage::success(kind)
                        .with_id(&client)
                        .with_request_id(request_id),
                );
                *state = SessionState::Identified(client);
                self.broadcast_lobby_list();
                Flow::Continue
            }
            Err(SessionError::UnknownIdentity(client)) => {
                tracing::warn!(
                    conn_id = %handle.id(),
                    client_id = %client,
                    "reconnect with unknown identity"
                );
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, "Reconnect failed: unknown client")
                        .with_request_id(request_id),
                );
                handle.close(CloseCode::ProtocolViolation.with_reason("Reconnect failed"));
                Flow::Close
            }
            Err(e @ SessionError::CapacityExceeded { .. }) => {
                tracing::warn!(conn_id = %handle.id(), error = %e, "handshake refused");
                self.reply(
                    handle,
                    &ServerMessage::failure(kind, CloseCode::CapacityExceeded.reason())
                        .with_request_id(request_id),
                );
                handle.close(CloseCode::CapacityExceeded);
                Flow::Close
            }
        }
    }

    /// Rebinds a known identity to `handle`, closing whatever socket it
    /// was on and pointing its lobby memberships at the new one.
    fn reattach(
        &mut self,
        handle: &ConnectionHandle,
        client: ClientId,
    ) -> Result<ClientId, SessionError> {
        let Reattached { client, superseded } = self.sessions.reconnect(client, handle.clone())?;

        if let Some(old) = superseded {
            tracing::info!(
                client_id = %client,
                old_conn = %old.id(),
                new_conn = %handle.id(),
                "connection superseded by reconnect"
            );
            old.close(CloseCode::Superseded);
        }

        let rebound = self.lobbies.rebind(&client, handle.id());
        if rebound > 0 {
            tracing::debug!(client_id = %client, lobbies = rebound, "lobby memberships rebound");
        }
        Ok(client)
    }

    /// Answers a non-handshake first frame and closes the connection.
    fn reject_unidentified(
        &self,
        handle: &ConnectionHandle,
        tag: ProtocolTag,
        request_id: Option<u64>,
    ) -> Flow {
        tracing::warn!(
            conn_id = %handle.id(),
            protocol = %tag,
            "first message must be CONNECT or RECONNECT"
        );
        self.reply(
            handle,
            &ServerMessage::failure(tag, "First message must be CONNECT or RECONNECT")
                .with_request_id(request_id),
        );
        handle.close(CloseCode::ProtocolViolation.with_reason("First message must be CONNECT"));
        Flow::Close
    }
}

#[cfg(test)]
mod tests {
    use paddock_protocol::{Codec, JsonCodec};
    use paddock_session::Outbound;
    use paddock_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_reject_unidentified_reply_names_the_rule() {
        let coord = Coordinator::default();
        let (handle, mut rx) = ConnectionHandle::new(ConnectionId::new(1));

        let flow = coord.reject_unidentified(&handle, Protocol::GetLobbyList.into(), Some(2));

        assert_eq!(flow, Flow::Close);
        let Ok(Outbound::Frame(bytes)) = rx.try_recv() else {
            panic!("expected a reply frame");
        };
        let reply: ServerMessage = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(reply.protocol, ProtocolTag::Known(Protocol::GetLobbyList));
        assert_eq!(
            reply.error.as_deref(),
            Some("First message must be CONNECT or RECONNECT")
        );
        assert_eq!(reply.request_id, Some(2));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close(r)) if r.code == 1008));
    }
}
