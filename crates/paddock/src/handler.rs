//! Per-connection task.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The task owns the socket and the connection's
//! [`SessionState`], and multiplexes three things:
//!
//!   1. the outbound queue: replies, broadcasts, and close requests the
//!      coordinator pushed onto this connection's [`ConnectionHandle`]
//!   2. the idle timer, when one is configured
//!   3. inbound frames, each applied to the coordinator under its lock
//!
//! Whatever ends the loop, the coordinator is told the connection closed.

use std::sync::Arc;

use paddock_protocol::CloseCode;
use paddock_session::{ConnectionHandle, Outbound, SessionState};
use paddock_transport::{Connection, WebSocketConnection};
use tokio::time::Instant;

use crate::PaddockError;
use crate::coordinator::Flow;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), PaddockError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "connection opened");
    let (handle, mut outbound) = ConnectionHandle::new(conn_id);
    let mut session = SessionState::default();

    // Once set, no more frames are read; the queue drains up to its Close.
    let mut closing = state.coordinator.lock().await.open(&handle) == Flow::Close;

    let idle_timeout = state.config.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout.unwrap_or_default());
    tokio::pin!(idle);

    let result = loop {
        tokio::select! {
            biased;

            Some(out) = outbound.recv() => match out {
                Outbound::Frame(bytes) => {
                    if let Err(e) = conn.send(&bytes).await {
                        break Err(e.into());
                    }
                }
                Outbound::Close(reason) => {
                    tracing::debug!(%conn_id, %reason, "closing connection");
                    if let Err(e) = conn.close(Some(reason)).await {
                        tracing::debug!(%conn_id, error = %e, "close frame not delivered");
                    }
                    break Ok(());
                }
            },

            () = &mut idle, if idle_timeout.is_some() && !closing => {
                tracing::info!(%conn_id, client_id = ?session.client(), "idle timeout");
                handle.close(CloseCode::IdleTimeout);
                closing = true;
            }

            frame = conn.recv(), if !closing => match frame {
                Ok(Some(data)) => {
                    if let Some(timeout) = idle_timeout {
                        idle.as_mut().reset(Instant::now() + timeout);
                    }
                    let mut coordinator = state.coordinator.lock().await;
                    if coordinator.handle_frame(&handle, &mut session, &data) == Flow::Close {
                        closing = true;
                    }
                }
                Ok(None) => {
                    tracing::debug!(%conn_id, client_id = ?session.client(), "closed by peer");
                    break Ok(());
                }
                Err(e) => break Err(e.into()),
            },
        }
    };

    state.coordinator.lock().await.close(conn_id);
    result
}
