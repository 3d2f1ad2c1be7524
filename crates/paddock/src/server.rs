//! `PaddockServer` builder and accept loop.
//!
//! This is the entry point for running a Paddock server. It ties together
//! all the layers: transport → protocol → session → lobby.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use paddock_transport::{Transport, TransportError, WebSocketTransport};
use tokio::sync::Mutex;

use crate::coordinator::Coordinator;
use crate::handler::handle_connection;
use crate::{Environment, PaddockError, ServerConfig};

/// Shared server state passed to each connection task.
///
/// The coordinator sits behind a single mutex: one writer at a time, and
/// it is never held across an await.
pub(crate) struct ServerState {
    pub(crate) coordinator: Mutex<Coordinator>,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Paddock server.
///
/// # Example
///
/// ```rust,no_run
/// use paddock::prelude::*;
///
/// # async fn run() -> Result<(), PaddockError> {
/// let server = PaddockServer::builder()
///     .bind("127.0.0.1:3000")
///     .max_connections(50)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PaddockServerBuilder {
    config: ServerConfig,
}

impl PaddockServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the WebSocket upgrade path.
    pub fn ws_path(mut self, path: &str) -> Self {
        self.config.ws_path = path.to_string();
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.allowed_origins = origins;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn lobby_capacity(mut self, capacity: usize) -> Self {
        self.config.lobby_capacity = capacity;
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<PaddockServer, PaddockError> {
        let config = self.config;
        let transport =
            WebSocketTransport::bind(&config.bind_addr, config.upgrade_policy()).await?;

        let coordinator = Coordinator::new(config.session_config(), config.lobby_config());
        let state = Arc::new(ServerState {
            coordinator: Mutex::new(coordinator),
            config,
        });

        Ok(PaddockServer { transport, state })
    }
}

/// A Paddock server, bound and ready to accept.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct PaddockServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl PaddockServer {
    /// Creates a new builder.
    pub fn builder() -> PaddockServerBuilder {
        PaddockServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), PaddockError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Each accepted connection gets its own task, which also performs the
    /// WebSocket upgrade. Connections already running are not interrupted
    /// by shutdown; only accepting stops.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), PaddockError> {
        let config = &self.state.config;
        tracing::info!(
            addr = %self.transport.local_addr()?,
            path = %config.ws_path,
            max_connections = config.max_connections,
            environment = %config.environment,
            idle_timeout = ?config.idle_timeout,
            "Paddock server running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.transport.accept_pending() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = pending.peer_addr();
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(TransportError::UpgradeRejected(reason)) => {
                                    tracing::debug!(%peer, %reason, "upgrade rejected");
                                    return;
                                }
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        Ok(())
    }
}
