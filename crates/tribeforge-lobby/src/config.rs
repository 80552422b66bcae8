//! Lobby configuration.

use serde::{Deserialize, Serialize};

/// Seats per game when no other value is configured.
pub const DEFAULT_TOTAL_SEATS: u32 = 9;

/// Display name given to a player on first contact.
pub const DEFAULT_PLAYER_NAME: &str = "New Player";

/// Settings shared by every game in a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Humans plus bots in every game. Bots fill whatever the members
    /// don't; once members reach this number no bots are left.
    pub total_seats: u32,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            total_seats: DEFAULT_TOTAL_SEATS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default() {
        assert_eq!(LobbyConfig::default().total_seats, 9);
    }
}
