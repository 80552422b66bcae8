//! Shared vocabulary for Tribeforge.
//!
//! This crate defines the values every other layer talks in:
//!
//! - **Types** ([`PlayerId`], [`GameId`], [`GameConfig`], [`Tribe`], ...):
//!   the lobby's entities and their fixed enumerations.
//! - **Messages** ([`Envelope`], [`ClientMessage`], [`ServerMessage`]):
//!   what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Lobby (games, players)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, Envelope, ServerMessage};
pub use types::{
    BotCounts, Difficulty, GameConfig, GameId, GameView, MapSize, MapType,
    PlayerEntry, PlayerId, RandomSetup, Selection, Tribe,
};
