//! Server configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use paddock_lobby::LobbyConfig;
use paddock_session::SessionConfig;
use paddock_transport::UpgradePolicy;

/// Deployment mode. Only logged; the core behaves the same in all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

/// Returned when an environment name isn't recognised.
#[derive(Debug, thiserror::Error)]
#[error("unknown environment {0:?} (expected development, production or test)")]
pub struct UnknownEnvironment(String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(UnknownEnvironment(s.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        })
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// The only path that accepts WebSocket upgrades.
    pub ws_path: String,

    /// Ceiling on connections bound to an identity.
    pub max_connections: usize,

    /// Origins allowed to upgrade. Empty allows any.
    pub allowed_origins: Vec<String>,

    pub environment: Environment,

    /// Close connections that send nothing for this long. `None` disables.
    pub idle_timeout: Option<Duration>,

    /// Members per lobby, host included.
    pub lobby_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            ws_path: "/ws".to_string(),
            max_connections: SessionConfig::default().max_connections,
            allowed_origins: Vec::new(),
            environment: Environment::default(),
            idle_timeout: None,
            lobby_capacity: LobbyConfig::default().capacity,
        }
    }
}

impl ServerConfig {
    pub fn upgrade_policy(&self) -> UpgradePolicy {
        UpgradePolicy {
            path: self.ws_path.clone(),
            allowed_origins: self.allowed_origins.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_connections: self.max_connections,
        }
    }

    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            capacity: self.lobby_capacity,
        }
    }
}

/// Splits a comma-separated origin list, dropping blanks.
///
/// `"https://a.example, https://b.example,"` yields two origins.
pub fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
