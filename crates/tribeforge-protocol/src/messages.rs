//! Wire messages exchanged between a lobby client and the server.
//!
//! Both directions use internally tagged JSON:
//!   `{ "type": "OpenGame", "game_id": "9f2c41d07ab3e865" }`
//! which is the easiest shape to switch on from JavaScript.

use serde::{Deserialize, Serialize};

use crate::{
    Difficulty, GameId, GameView, MapSize, MapType, PlayerId, RandomSetup, Tribe,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the wire is an `Envelope`.
///
/// ```text
/// ┌─────────────────────────────────┐
/// │ seq: 42                         │  ← per-direction counter
/// │ timestamp: 15000                │  ← ms since the sender started
/// │ ┌─────────────────────────────┐ │
/// │ │ payload: { "type": ... }    │ │
/// │ └─────────────────────────────┘ │
/// └─────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub seq: u64,
    pub timestamp: u64,
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(seq: u64, timestamp: u64, payload: P) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Requests a client can make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Must be the first message on a connection.
    ///
    /// `token` is the client-held player token. `None` asks the server to
    /// issue a fresh one (a brand-new anonymous player).
    Hello { token: Option<String> },

    /// Keep-alive. Echoed back as `HeartbeatAck`.
    Heartbeat { client_time: u64 },

    /// Ask for the caller's display name.
    GetProfile,

    /// Change the caller's display name.
    SetName { name: String },

    /// Open a game page: create the game if needed and join it.
    /// `None` means "start a new game with a random id".
    OpenGame { game_id: Option<GameId> },

    /// Read a game's configuration and member list without joining.
    GetGame { game_id: GameId },

    /// Reshuffle map, bots, and every member's tribe.
    Regenerate { game_id: GameId },

    /// List the games the caller is a member of.
    ListMyGames,

    /// Draw a one-off setup from the chosen values. Nothing is stored.
    Randomize {
        players: u32,
        map_types: Vec<MapType>,
        map_sizes: Vec<MapSize>,
        tribes: Vec<Tribe>,
        difficulties: Vec<Difficulty>,
    },

    /// The client is going away.
    Disconnect { reason: String },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Responses and notifications sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `Hello`. `token` is what the client should keep for next
    /// time; it is the same value as `player_id`.
    Welcome {
        player_id: PlayerId,
        token: String,
        name: String,
    },

    HeartbeatAck { client_time: u64, server_time: u64 },

    Profile { name: String },

    NameChanged { name: String },

    /// Reply to `OpenGame`, after the caller has been admitted.
    GameOpened { view: GameView },

    /// Reply to `GetGame`.
    Game { view: GameView },

    /// Reply to `Regenerate`.
    Regenerated { view: GameView },

    MyGames { game_ids: Vec<GameId> },

    /// Reply to `Randomize`.
    Randomized { setup: RandomSetup },

    /// `code` follows HTTP conventions (400, 404, 409, 500).
    Error { code: u16, message: String },
}
