//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::{StatusCode, header};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::{CloseReason, Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound on how long a peer may take to finish the HTTP upgrade.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<TcpStream>;

/// Which upgrade requests the transport accepts.
#[derive(Debug, Clone)]
pub struct UpgradePolicy {
    /// The only request path that may upgrade, e.g. `/ws`.
    pub path: String,

    /// Origins allowed to upgrade. Empty means any origin. Requests that
    /// carry no `Origin` header (non-browser clients) are always allowed.
    pub allowed_origins: Vec<String>,
}

impl Default for UpgradePolicy {
    fn default() -> Self {
        Self {
            path: "/ws".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl UpgradePolicy {
    /// Checks an upgrade request against the policy.
    fn check(&self, request: &Request) -> Result<(), (StatusCode, String)> {
        if request.uri().path() != self.path {
            return Err((
                StatusCode::NOT_FOUND,
                format!("no WebSocket endpoint at {}", request.uri().path()),
            ));
        }

        if self.allowed_origins.is_empty() {
            return Ok(());
        }

        match request.headers().get(header::ORIGIN) {
            None => Ok(()),
            Some(origin) => {
                let origin = origin.to_str().unwrap_or_default();
                if self.allowed_origins.iter().any(|o| o == origin) {
                    Ok(())
                } else {
                    Err((
                        StatusCode::FORBIDDEN,
                        format!("origin {origin:?} is not allowed"),
                    ))
                }
            }
        }
    }
}

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// [`accept_pending`](Self::accept_pending) only takes the TCP connection;
/// the HTTP upgrade happens in [`PendingUpgrade::upgrade`], so a caller
/// can run it off the accept loop and a slow peer stalls nobody else.
/// [`Transport::accept`] does both in one step.
pub struct WebSocketTransport {
    listener: TcpListener,
    policy: Arc<UpgradePolicy>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(
        addr: &str,
        policy: UpgradePolicy,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, path = %policy.path, "WebSocket transport listening");
        Ok(Self {
            listener,
            policy: Arc::new(policy),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection without upgrading it.
    pub async fn accept_pending(&mut self) -> Result<PendingUpgrade, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingUpgrade {
            stream,
            peer,
            policy: Arc::clone(&self.policy),
        })
    }
}

/// A TCP connection that has not completed the WebSocket upgrade.
pub struct PendingUpgrade {
    stream: TcpStream,
    peer: SocketAddr,
    policy: Arc<UpgradePolicy>,
}

impl PendingUpgrade {
    /// Returns the remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Runs the HTTP upgrade against the transport's [`UpgradePolicy`].
    ///
    /// Bounded by a 5 second timeout. A refused or stalled upgrade is
    /// [`TransportError::UpgradeRejected`].
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self {
            stream,
            peer,
            policy,
        } = self;
        let callback = |request: &Request, response: Response| {
            policy.check(request).map(|()| response).map_err(|(status, msg)| {
                tracing::debug!(%status, %msg, %peer, "refusing WebSocket upgrade");
                let mut refusal = ErrorResponse::new(Some(msg));
                *refusal.status_mut() = status;
                refusal
            })
        };

        let ws = match tokio::time::timeout(
            UPGRADE_TIMEOUT,
            tokio_tungstenite::accept_hdr_async(stream, callback),
        )
        .await
        {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => return Err(TransportError::UpgradeRejected(e.to_string())),
            Err(_) => {
                return Err(TransportError::UpgradeRejected(
                    "upgrade timed out".into(),
                ));
            }
        };

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accept_pending().await?.upgrade().await
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a pending `recv` never blocks a `send`.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Returns the remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Valid UTF-8 goes out as a text frame (browsers hand text frames to
    /// `JSON.parse` directly); anything else as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self, reason: Option<CloseReason>) -> Result<(), Self::Error> {
        let frame = reason.map(|r| CloseFrame {
            code: CloseCode::from(r.code),
            reason: r.reason.into(),
        });
        self.sink
            .lock()
            .await
            .send(Message::Close(frame))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
