//! Client session management for Paddock.
//!
//! This crate answers "who is on the other end of this socket?":
//!
//! 1. **Identity**: minting opaque client identities ([`IdentityIssuer`])
//! 2. **Connection registry**: the two-way map between identities and live
//!    connections, plus the global connection ceiling
//!    ([`ConnectionRegistry`], [`ConnectionHandle`])
//! 3. **Reconnection**: reattaching a previously issued identity to a new
//!    connection ([`SessionManager`], [`SessionState`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)   ← keys membership by ClientId
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol / Transport (below)  ← ClientId, ConnectionId, CloseReason
//! ```

mod error;
mod identity;
mod manager;
mod registry;
mod session;

pub use error::SessionError;
pub use identity::IdentityIssuer;
pub use manager::{Reattached, SessionManager};
pub use registry::{ConnectionHandle, ConnectionRegistry, Outbound};
pub use session::{SessionConfig, SessionState};
