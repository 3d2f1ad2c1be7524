//! Lobby configuration.

/// Configuration shared by every lobby in a registry.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Maximum members per lobby, host included.
    pub capacity: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self { capacity: 6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default_capacity_is_six() {
        assert_eq!(LobbyConfig::default().capacity, 6);
    }
}
