//! Membership relation: which players sit in which games, and as which
//! tribe.
//!
//! At most one row per `(game, player)` pair. Rows are never deleted;
//! only the tribe changes after insertion.

use rusqlite::{Connection, OptionalExtension, params};
use tribeforge_protocol::{GameId, PlayerEntry, PlayerId, Tribe};

use crate::{Entity, StoreError};

/// Membership rows, borrowed from an open transaction.
pub struct Memberships<'c> {
    conn: &'c Connection,
}

impl<'c> Memberships<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Players in `game_id`, in the order they joined.
    pub fn players(&self, game_id: &GameId) -> Result<Vec<PlayerId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id FROM memberships WHERE game_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([game_id.as_str()], |row| row.get(0))?;
        let players = rows
            .map(|r| r.map(PlayerId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    /// Games `player_id` is a member of, oldest membership first.
    pub fn games(&self, player_id: &PlayerId) -> Result<Vec<GameId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id FROM memberships WHERE player_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([player_id.as_str()], |row| row.get(0))?;
        let games = rows
            .map(|r| r.map(GameId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(games)
    }

    /// Returns `true` if `player_id` is a member of `game_id`.
    pub fn contains(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<bool, StoreError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM memberships WHERE game_id = ?1 AND player_id = ?2
            )",
            params![game_id.as_str(), player_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Number of members in `game_id`.
    pub fn count(&self, game_id: &GameId) -> Result<u32, StoreError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE game_id = ?1",
            [game_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Adds `player_id` to `game_id` with the given tribe.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the game or the player doesn't exist
    /// - [`StoreError::Conflict`] if the pair is already present
    pub fn add(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        tribe: Tribe,
    ) -> Result<(), StoreError> {
        let referenced: (bool, bool) = self.conn.query_row(
            "SELECT
                EXISTS(SELECT 1 FROM games WHERE game_id = ?1),
                EXISTS(SELECT 1 FROM players WHERE player_id = ?2)",
            params![game_id.as_str(), player_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match referenced {
            (false, _) => return Err(StoreError::game_not_found(game_id)),
            (_, false) => return Err(StoreError::player_not_found(player_id)),
            (true, true) => {}
        }
        if self.contains(game_id, player_id)? {
            return Err(StoreError::Conflict {
                game_id: game_id.clone(),
                player_id: player_id.clone(),
            });
        }

        self.conn.execute(
            "INSERT INTO memberships (game_id, player_id, tribe) VALUES (?1, ?2, ?3)",
            params![game_id.as_str(), player_id.as_str(), tribe.as_str()],
        )?;
        tracing::debug!(%game_id, %player_id, %tribe, "inserted membership");
        Ok(())
    }

    /// The tribe `player_id` plays in `game_id`.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the pair is absent.
    pub fn tribe(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<Tribe, StoreError> {
        let raw: String = self
            .conn
            .query_row(
                "SELECT tribe FROM memberships WHERE game_id = ?1 AND player_id = ?2",
                params![game_id.as_str(), player_id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::membership_not_found(game_id, player_id))?;
        parse_tribe(&raw, game_id, player_id)
    }

    /// Changes the tribe of an existing membership.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the pair is absent.
    pub fn set_tribe(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        tribe: Tribe,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE memberships SET tribe = ?1 WHERE game_id = ?2 AND player_id = ?3",
            params![tribe.as_str(), game_id.as_str(), player_id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::membership_not_found(game_id, player_id));
        }
        tracing::debug!(%game_id, %player_id, %tribe, "updated tribe");
        Ok(())
    }

    /// Member names and tribes of `game_id`, in join order.
    pub fn roster(&self, game_id: &GameId) -> Result<Vec<PlayerEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.player_id, p.name, m.tribe
            FROM memberships m
            JOIN players p ON p.player_id = m.player_id
            WHERE m.game_id = ?1
            ORDER BY m.id",
        )?;
        let rows = stmt.query_map([game_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (player_id, name, tribe) = row?;
            let tribe = parse_tribe(&tribe, game_id, &PlayerId(player_id))?;
            entries.push(PlayerEntry { name, tribe });
        }
        Ok(entries)
    }
}

fn parse_tribe(
    raw: &str,
    game_id: &GameId,
    player_id: &PlayerId,
) -> Result<Tribe, StoreError> {
    raw.parse().map_err(|e| StoreError::Corrupt {
        entity: Entity::Membership,
        id: format!("{game_id}/{player_id}"),
        reason: format!("{e}"),
    })
}
