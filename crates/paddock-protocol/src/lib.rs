//! Wire protocol for Paddock.
//!
//! This crate defines the JSON messages clients and the server exchange:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Protocol`],
//!   [`LobbySummary`], [`CloseCode`]): the structures on the wire.
//! - **Frames** ([`RawFrame`]): envelope-first parsing of inbound bytes.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes ↔ types.
//!
//! The protocol layer knows nothing about sessions or lobbies; it only
//! names them ([`ClientId`], [`LobbyId`]).
//!
//! ```text
//! Transport (bytes) → Protocol (RawFrame → ClientMessage) → Coordinator
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use frame::RawFrame;
pub use types::{
    ClientId, ClientMessage, CloseCode, LobbyId, LobbySummary, Protocol,
    ProtocolTag, ServerMessage,
};
