//! Persistence for Tribeforge lobbies.
//!
//! Three relations live in one SQLite database:
//!
//! 1. **Players** ([`Players`]): player id → display name
//! 2. **Games** ([`Games`]): game id → configuration record
//! 3. **Memberships** ([`Memberships`]): `(game, player)` → tribe,
//!    unique per pair
//!
//! All access goes through [`Store::transaction`], so a group of calls
//! commits together or not at all.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)  ← decides WHEN to create, admit, regenerate
//!     ↕
//! Store Layer (this crate)  ← owns the records and their uniqueness
//!     ↕
//! Protocol Layer (below)  ← provides GameId, PlayerId, GameConfig, Tribe
//! ```
//!
//! The store never calls back up into the lobby.

mod db;
mod error;
mod games;
mod memberships;
mod players;

pub use db::{Store, Tables};
pub use error::{Entity, StoreError};
pub use games::Games;
pub use memberships::Memberships;
pub use players::Players;
