//! # Tribeforge
//!
//! A lobby server for setting up randomized Polytopia-style games.
//!
//! A player opens a game link; the server creates the game on first
//! access with a random map and bot lineup, seats the player with a random
//! tribe, and shrinks the bot count so humans plus bots always fill the
//! table. Everything is persisted in SQLite.
//!
//! ```text
//! WebSocket (transport) → Envelope (protocol) → Lobby → Store (SQLite)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tribeforge::prelude::*;
//!
//! # async fn start() -> Result<(), TribeforgeError> {
//! let config = ServerConfig::load()?;
//! let server = TribeforgeServerBuilder::from_config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
pub mod transport;

pub use config::{CONFIG_FILE, ENV_PREFIX, ServerConfig};
pub use error::TribeforgeError;
pub use handler::{HELLO_TIMEOUT, IDLE_TIMEOUT};
pub use server::{TribeforgeServer, TribeforgeServerBuilder};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{
        ServerConfig, TribeforgeError, TribeforgeServer,
        TribeforgeServerBuilder,
    };
    pub use tribeforge_lobby::{Admission, Lobby, LobbyConfig, LobbyError};
    pub use tribeforge_protocol::{
        BotCounts, ClientMessage, Codec, Difficulty, Envelope, GameConfig,
        GameId, GameView, JsonCodec, MapSize, MapType, PlayerEntry, PlayerId,
        RandomSetup, Selection, ServerMessage, Tribe,
    };
}
