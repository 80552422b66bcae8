//! Identity relation: maps a player id to a display name.

use rusqlite::{Connection, OptionalExtension, params};
use tribeforge_protocol::PlayerId;

use crate::{Entity, StoreError};

/// Player records, borrowed from an open transaction.
pub struct Players<'c> {
    conn: &'c Connection,
}

impl<'c> Players<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Returns `true` if a record exists for `id`.
    pub fn exists(&self, id: &PlayerId) -> Result<bool, StoreError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM players WHERE player_id = ?1)",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Creates a player record.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if `id` is taken.
    pub fn create(&self, id: &PlayerId, name: &str) -> Result<(), StoreError> {
        if self.exists(id)? {
            return Err(StoreError::AlreadyExists(Entity::Player, id.to_string()));
        }
        self.conn.execute(
            "INSERT INTO players (player_id, name) VALUES (?1, ?2)",
            params![id.as_str(), name],
        )?;
        tracing::debug!(player_id = %id, name, "inserted player");
        Ok(())
    }

    /// Returns the player's display name.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no such player.
    pub fn name(&self, id: &PlayerId) -> Result<String, StoreError> {
        self.conn
            .query_row(
                "SELECT name FROM players WHERE player_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::player_not_found(id))
    }

    /// Replaces the player's display name and returns the previous one.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no such player.
    pub fn set_name(
        &self,
        id: &PlayerId,
        name: &str,
    ) -> Result<String, StoreError> {
        let previous = self.name(id)?;
        self.conn.execute(
            "UPDATE players SET name = ?1 WHERE player_id = ?2",
            params![name, id.as_str()],
        )?;
        tracing::debug!(player_id = %id, from = %previous, to = name, "renamed player");
        Ok(previous)
    }
}
