//! # Paddock
//!
//! Real-time multiplayer session coordinator.
//!
//! Paddock accepts persistent WebSocket connections from game clients,
//! issues each client an opaque identity, lets a client reclaim that
//! identity on a new socket after a network drop, and keeps a registry of
//! small lobbies that every connected client sees in real time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paddock::prelude::*;
//!
//! # async fn run() -> Result<(), PaddockError> {
//! let server = PaddockServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .max_connections(100)
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```
//!
//! ## Layers
//!
//! | crate               | concern                                  |
//! |---------------------|------------------------------------------|
//! | `paddock-transport` | WebSocket accept, upgrade gating, frames |
//! | `paddock-protocol`  | wire messages, JSON codec, close codes   |
//! | `paddock-session`   | identities, connection registry          |
//! | `paddock-lobby`     | lobby registry                           |
//! | `paddock`           | coordinator, routing, server             |

mod broadcast;
mod config;
mod coordinator;
mod error;
mod handler;
mod handshake;
mod router;
mod server;

pub use config::{Environment, ServerConfig, UnknownEnvironment, parse_origins};
pub use coordinator::{Coordinator, Flow};
pub use error::PaddockError;
pub use router::RouteError;
pub use server::{PaddockServer, PaddockServerBuilder};

/// Common imports for running a server.
pub mod prelude {
    pub use crate::{
        Coordinator, Environment, Flow, PaddockError, PaddockServer, PaddockServerBuilder,
        RouteError, ServerConfig,
    };
    pub use paddock_lobby::{LobbyConfig, LobbyError};
    pub use paddock_protocol::{
        ClientId, ClientMessage, CloseCode, LobbyId, LobbySummary, Protocol, ProtocolTag,
        ServerMessage,
    };
    pub use paddock_session::{ConnectionHandle, Outbound, SessionConfig, SessionState};
    pub use paddock_transport::ConnectionId;
}
