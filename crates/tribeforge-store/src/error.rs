//! Error types for the persistence layer.

use std::fmt;

use tribeforge_protocol::{GameId, PlayerId};

/// Which relation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Player,
    Game,
    Membership,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Game => write!(f, "game"),
            Self::Membership => write!(f, "membership"),
        }
    }
}

/// Errors that can occur while reading or writing the store.
///
/// The first three variants are precondition violations from the
/// caller's point of view. The store reports them and changes nothing;
/// it never retries or merges.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{0} {1} not found")]
    NotFound(Entity, String),

    /// A record with this identifier is already present.
    #[error("{0} {1} already exists")]
    AlreadyExists(Entity, String),

    /// The player is already a member of the game.
    #[error("player {player_id} is already a member of game {game_id}")]
    Conflict { game_id: GameId, player_id: PlayerId },

    /// A persisted value no longer parses, e.g. a tribe name that was
    /// renamed since the row was written.
    #[error("corrupt {entity} row {id}: {reason}")]
    Corrupt {
        entity: Entity,
        id: String,
        reason: String,
    },

    /// The underlying SQLite call failed.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn player_not_found(id: &PlayerId) -> Self {
        Self::NotFound(Entity::Player, id.to_string())
    }

    pub fn game_not_found(id: &GameId) -> Self {
        Self::NotFound(Entity::Game, id.to_string())
    }

    pub fn membership_not_found(
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Self {
        Self::NotFound(Entity::Membership, format!("{game_id}/{player_id}"))
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}
