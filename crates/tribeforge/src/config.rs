//! Server configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. `tribeforge.toml` in the working directory, if present
//! 3. `TRIBEFORGE_*` environment variables (`TRIBEFORGE_BIND_ADDR`, ...)

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tribeforge_lobby::{DEFAULT_TOTAL_SEATS, LobbyConfig};

use crate::TribeforgeError;

/// Configuration file read by [`ServerConfig::load`].
pub const CONFIG_FILE: &str = "tribeforge.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TRIBEFORGE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// SQLite database file. `:memory:` keeps everything in RAM.
    pub database_path: PathBuf,

    /// Seats per game, humans plus bots.
    pub total_seats: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8443".to_string(),
            database_path: PathBuf::from("tribeforge.db"),
            total_seats: DEFAULT_TOTAL_SEATS,
        }
    }
}

impl ServerConfig {
    /// Loads from the defaults, [`CONFIG_FILE`], and the environment.
    pub fn load() -> Result<Self, TribeforgeError> {
        Ok(Self::figment(CONFIG_FILE).extract()?)
    }

    /// The provider stack behind [`load`](Self::load), reading the TOML
    /// file at `file` instead of the default location.
    pub fn figment(file: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            total_seats: self.total_seats,
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config: ServerConfig = ServerConfig::figment(CONFIG_FILE).extract()?;
            assert_eq!(config, ServerConfig::default());
            assert_eq!(config.lobby_config(), LobbyConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    bind_addr = "0.0.0.0:9000"
                    database_path = "/var/lib/tribeforge/lobby.db"
                "#,
            )?;
            let config: ServerConfig = ServerConfig::figment(CONFIG_FILE).extract()?;
            assert_eq!(config.bind_addr, "0.0.0.0:9000");
            assert_eq!(
                config.database_path,
                PathBuf::from("/var/lib/tribeforge/lobby.db")
            );
            assert_eq!(config.total_seats, 9);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "total_seats = 6")?;
            jail.set_env("TRIBEFORGE_TOTAL_SEATS", "4");
            jail.set_env("TRIBEFORGE_DATABASE_PATH", ":memory:");
            let config: ServerConfig = ServerConfig::figment(CONFIG_FILE).extract()?;
            assert_eq!(config.total_seats, 4);
            assert_eq!(config.database_path, PathBuf::from(":memory:"));
            assert_eq!(config.lobby_config().total_seats, 4);
            Ok(())
        });
    }

    #[test]
    fn test_bad_value_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("TRIBEFORGE_TOTAL_SEATS", "lots");
            let result = ServerConfig::figment(CONFIG_FILE).extract::<ServerConfig>();
            assert!(result.is_err());
            Ok(())
        });
    }
}
