//! Pushing the lobby list to every identified connection.

use std::sync::Arc;

use paddock_protocol::{Codec, ServerMessage};

use crate::coordinator::Coordinator;

impl Coordinator {
    /// Sends the current lobby list to every bound connection.
    ///
    /// The list is snapshotted and encoded once; every connection gets the
    /// same bytes. Broadcasts never carry a `requestId`. Returns how many
    /// connections the frame was queued on.
    pub fn broadcast_lobby_list(&self) -> usize {
        let lobbies = self.lobbies.list();
        let count = lobbies.len();
        let frame: Arc<[u8]> = match self.codec.encode(&ServerMessage::lobby_list(lobbies)) {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode lobby list");
                return 0;
            }
        };

        let delivered = self
            .sessions
            .handles()
            .filter(|handle| handle.send(Arc::clone(&frame)))
            .count();

        tracing::debug!(lobbies = count, delivered, "broadcast lobby list");
        delivered
    }
}
