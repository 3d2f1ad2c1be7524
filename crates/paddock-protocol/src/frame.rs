//! Two-stage parsing of inbound client frames.
//!
//! A frame is first read as a loose JSON object so the server can learn
//! its `protocol` discriminator and `requestId` even when the rest of the
//! message is wrong. Only then is it converted into a [`ClientMessage`].
//! That split is what lets the router answer an unknown kind with an
//! echoed tag instead of treating it as garbage.

use serde_json::{Map, Value};

use crate::{ClientMessage, Codec, Protocol, ProtocolError};

/// An inbound frame whose envelope has been validated but whose body has
/// not.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// The raw `protocol` discriminator, known or not.
    pub protocol: String,
    /// Optional correlation id to echo on the response.
    pub request_id: Option<u64>,
    body: Map<String, Value>,
}

impl RawFrame {
    /// Reads the envelope of a frame.
    ///
    /// # Errors
    /// `Decode` if the bytes are not JSON; `InvalidMessage` if they are not
    /// an object with a string `protocol` field.
    pub fn decode<C: Codec>(codec: &C, data: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = codec.decode(data)?;
        let Value::Object(body) = value else {
            return Err(ProtocolError::InvalidMessage(
                "frame is not a JSON object".into(),
            ));
        };

        let protocol = match body.get("protocol") {
            Some(Value::String(p)) => p.clone(),
            Some(_) => {
                return Err(ProtocolError::InvalidMessage(
                    "`protocol` must be a string".into(),
                ));
            }
            None => {
                return Err(ProtocolError::InvalidMessage(
                    "missing `protocol` field".into(),
                ));
            }
        };

        // A requestId that isn't a non-negative integer is ignored rather
        // than failing the frame.
        let request_id = body.get("requestId").and_then(Value::as_u64);

        Ok(Self {
            protocol,
            request_id,
            body,
        })
    }

    /// Resolves the discriminator to a known kind.
    ///
    /// # Errors
    /// `UnknownProtocol` carrying the raw discriminator.
    pub fn kind(&self) -> Result<Protocol, ProtocolError> {
        self.protocol.parse()
    }

    /// Converts the frame into a typed message.
    ///
    /// # Errors
    /// `UnknownProtocol` for an unknown kind, `InvalidMessage` if the
    /// kind-specific fields are missing or mistyped.
    pub fn into_message(self) -> Result<ClientMessage, ProtocolError> {
        self.kind()?;
        serde_json::from_value(Value::Object(self.body))
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientId, JsonCodec, LobbyId};

    fn decode(data: &str) -> Result<RawFrame, ProtocolError> {
        RawFrame::decode(&JsonCodec, data.as_bytes())
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_decode_reads_protocol_and_request_id() {
        let frame = decode(r#"{"protocol":"GET_LOBBY_LIST","requestId":42}"#).unwrap();
        assert_eq!(frame.protocol, "GET_LOBBY_LIST");
        assert_eq!(frame.request_id, Some(42));
    }

    #[test]
    fn test_decode_without_request_id_is_none() {
        let frame = decode(r#"{"protocol":"CONNECT"}"#).unwrap();
        assert_eq!(frame.request_id, None);
    }

    #[test]
    fn test_decode_non_numeric_request_id_is_ignored() {
        let frame = decode(r#"{"protocol":"CONNECT","requestId":"seven"}"#).unwrap();
        assert_eq!(frame.request_id, None);
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        assert!(matches!(decode("{{nope"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_array_returns_invalid_message() {
        assert!(matches!(
            decode(r#"["CONNECT"]"#),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_missing_protocol_returns_invalid_message() {
        assert!(matches!(
            decode(r#"{"id":"abc"}"#),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_numeric_protocol_returns_invalid_message() {
        assert!(matches!(
            decode(r#"{"protocol":5}"#),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    // =====================================================================
    // Kind and body
    // =====================================================================

    #[test]
    fn test_kind_unknown_returns_unknown_protocol() {
        let frame = decode(r#"{"protocol":"DANCE"}"#).unwrap();
        let err = frame.kind().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownProtocol(p) if p == "DANCE"));
    }

    #[test]
    fn test_into_message_reconnect() {
        let frame = decode(r#"{"protocol":"RECONNECT","id":"c-1","requestId":1}"#).unwrap();
        assert_eq!(
            frame.into_message().unwrap(),
            ClientMessage::Reconnect {
                id: ClientId::from("c-1")
            }
        );
    }

    #[test]
    fn test_into_message_join_lobby() {
        let frame = decode(r#"{"protocol":"JOIN_LOBBY","id":"l-1"}"#).unwrap();
        assert_eq!(
            frame.into_message().unwrap(),
            ClientMessage::JoinLobby {
                id: LobbyId::from("l-1")
            }
        );
    }

    #[test]
    fn test_into_message_join_lobby_without_id_is_invalid() {
        let frame = decode(r#"{"protocol":"JOIN_LOBBY"}"#).unwrap();
        let err = frame.into_message().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_into_message_unknown_kind_returns_unknown_protocol() {
        let frame = decode(r#"{"protocol":"DANCE"}"#).unwrap();
        assert!(matches!(
            frame.into_message(),
            Err(ProtocolError::UnknownProtocol(_))
        ));
    }
}
