//! Game relation: maps a game id to its configuration record.

use rusqlite::{Connection, OptionalExtension, params};
use tribeforge_protocol::{BotCounts, GameConfig, GameId};

use crate::{Entity, StoreError};

/// Game records, borrowed from an open transaction.
pub struct Games<'c> {
    conn: &'c Connection,
}

/// A `games` row as SQLite returns it, before the enum columns are
/// parsed.
struct GameRow {
    map_type: String,
    map_size: String,
    bots: BotCounts,
}

impl GameRow {
    fn into_config(self, id: &GameId) -> Result<GameConfig, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: Entity::Game,
            id: id.to_string(),
            reason,
        };
        Ok(GameConfig {
            map_type: self.map_type.parse().map_err(|e| corrupt(format!("{e}")))?,
            map_size: self.map_size.parse().map_err(|e| corrupt(format!("{e}")))?,
            bots: self.bots,
        })
    }
}

impl<'c> Games<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Returns `true` if a record exists for `id`.
    pub fn exists(&self, id: &GameId) -> Result<bool, StoreError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM games WHERE game_id = ?1)",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Creates a game record.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if `id` is taken.
    pub fn create(
        &self,
        id: &GameId,
        config: &GameConfig,
    ) -> Result<(), StoreError> {
        if self.exists(id)? {
            return Err(StoreError::AlreadyExists(Entity::Game, id.to_string()));
        }
        self.conn.execute(
            "INSERT INTO games (
                game_id, map_type, map_size,
                easy_bots, normal_bots, hard_bots, crazy_bots
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.as_str(),
                config.map_type.as_str(),
                config.map_size.as_str(),
                config.bots.easy,
                config.bots.normal,
                config.bots.hard,
                config.bots.crazy,
            ],
        )?;
        tracing::debug!(game_id = %id, ?config, "inserted game");
        Ok(())
    }

    /// Returns the game's configuration record.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no such game.
    pub fn get(&self, id: &GameId) -> Result<GameConfig, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT map_type, map_size,
                    easy_bots, normal_bots, hard_bots, crazy_bots
                FROM games WHERE game_id = ?1",
                [id.as_str()],
                |row| {
                    Ok(GameRow {
                        map_type: row.get(0)?,
                        map_size: row.get(1)?,
                        bots: BotCounts {
                            easy: row.get(2)?,
                            normal: row.get(3)?,
                            hard: row.get(4)?,
                            crazy: row.get(5)?,
                        },
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::game_not_found(id))?;
        row.into_config(id)
    }

    /// Overwrites the whole configuration record. There is deliberately
    /// no per-field update.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no such game.
    pub fn replace(
        &self,
        id: &GameId,
        config: &GameConfig,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE games SET
                map_type = ?1, map_size = ?2,
                easy_bots = ?3, normal_bots = ?4,
                hard_bots = ?5, crazy_bots = ?6
            WHERE game_id = ?7",
            params![
                config.map_type.as_str(),
                config.map_size.as_str(),
                config.bots.easy,
                config.bots.normal,
                config.bots.hard,
                config.bots.crazy,
                id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::game_not_found(id));
        }
        tracing::debug!(game_id = %id, ?config, "replaced game");
        Ok(())
    }
}
