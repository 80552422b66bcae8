//! Game configuration and membership coordination for Tribeforge.
//!
//! # Key types
//!
//! - [`Lobby`]: the coordinator: creates games on first access, admits
//!   players, recomputes bot backfill, reshuffles on request
//! - [`Admission`]: what an admit call did
//! - [`LobbyConfig`]: seat budget shared by every game
//! - [`generator`]: the random draws (map, bots, tribes, identifiers,
//!   one-off setups)
//!
//! Control flows top-down: the lobby asks the generator for values, then
//! writes them through the store. The store never calls back.

mod config;
mod error;
pub mod generator;
mod lobby;
mod locks;

pub use config::{DEFAULT_PLAYER_NAME, DEFAULT_TOTAL_SEATS, LobbyConfig};
pub use error::LobbyError;
pub use lobby::{Admission, Lobby};
