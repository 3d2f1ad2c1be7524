//! Error types for the protocol layer.
//!
//! Decoding a client frame can fail at three depths, and the server
//! treats them differently:
//!
//! - the bytes are not a JSON object with a string `protocol` field
//!   ([`ProtocolError::Decode`] or [`ProtocolError::InvalidMessage`]),
//! - the `protocol` names a kind the server does not know
//!   ([`ProtocolError::UnknownProtocol`]),
//! - the kind is known but its fields are wrong
//!   ([`ProtocolError::InvalidMessage`]).

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not valid JSON.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The `protocol` discriminator does not name a known message kind.
    ///
    /// Carries the raw discriminator so the failure response can echo it.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// The frame is JSON but violates the envelope or the shape of its
    /// message kind (missing `protocol`, missing `id`, wrong types).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

