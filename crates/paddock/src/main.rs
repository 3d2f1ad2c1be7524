//! Paddock server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:3000, upgrades on /ws, 100 connections
//! paddock
//!
//! # Same knobs through the environment
//! PORT=8080 MAX_CONNECTIONS=500 ALLOWED_ORIGINS=https://game.example paddock
//! ```

use std::time::Duration;

use clap::Parser;
use paddock::{Environment, PaddockServer, ServerConfig, parse_origins};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Real-time multiplayer session coordinator
#[derive(Parser, Debug)]
#[command(name = "paddock")]
#[command(about = "Identities, reconnection, and lobbies over WebSocket")]
#[command(version)]
struct Args {
    /// Interface to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Path that accepts WebSocket upgrades
    #[arg(long, env = "WS_PATH", default_value = "/ws")]
    ws_path: String,

    /// Maximum concurrent identified connections
    #[arg(long, env = "MAX_CONNECTIONS", default_value = "100")]
    max_connections: usize,

    /// Comma-separated origins allowed to connect (empty allows any)
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    allowed_origins: String,

    /// development, production or test
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    environment: Environment,

    /// Close connections silent for this many seconds
    #[arg(long, env = "IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        ws_path: args.ws_path,
        max_connections: args.max_connections,
        allowed_origins: parse_origins(&args.allowed_origins),
        environment: args.environment,
        idle_timeout: args.idle_timeout_secs.map(Duration::from_secs),
        ..ServerConfig::default()
    };

    if config.environment == Environment::Production && config.allowed_origins.is_empty() {
        tracing::warn!("ALLOWED_ORIGINS is empty: any origin may connect");
    }

    let server = PaddockServer::builder().config(config).build().await?;
    tracing::info!("Listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Paddock server stopped");
    Ok(())
}
