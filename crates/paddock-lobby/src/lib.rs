//! Lobby management for Paddock.
//!
//! A lobby is a joinable pre-game group with a fixed capacity. Lobbies
//! live only in memory and are deleted the moment their last member
//! leaves.
//!
//! # Key types
//!
//! - [`LobbyRegistry`]: create / join / leave / list
//! - [`Lobby`]: one lobby and its members
//! - [`LobbyConfig`]: capacity
//! - [`LobbyError`]: recoverable failures, each answered with a typed
//!   failure response

mod config;
mod error;
mod lobby;
mod registry;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use lobby::{Lobby, Member};
pub use registry::LobbyRegistry;
