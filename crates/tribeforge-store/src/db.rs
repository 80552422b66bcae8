//! The store handle: one SQLite connection for the whole process.
//!
//! Every read or write goes through [`Store::transaction`], which hands
//! the closure a [`Tables`] view bound to an open transaction. If the
//! closure returns `Err`, the transaction is dropped and SQLite rolls it
//! back, so a multi-step change either lands completely or not at all.
//!
//! # Concurrency note
//!
//! The connection sits behind a `tokio::sync::Mutex`, so transactions
//! are serialized process-wide. Closures run synchronously while the
//! lock is held and must not block on anything but SQLite.
//!
//! That SQLite work, including the commit's fsync on a file database,
//! runs on the calling Tokio worker rather than on the blocking pool.
//! Each lobby transaction touches a handful of small rows, so the stall
//! is short; other tasks on the same worker wait for it. The closures
//! borrow ids and `self` from the caller, which `spawn_blocking`
//! would not allow without cloning every argument into `'static` data.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::{Games, Memberships, Players, StoreError};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS players (
        player_id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS games (
        game_id TEXT PRIMARY KEY,
        map_type TEXT NOT NULL,
        map_size TEXT NOT NULL,
        easy_bots INTEGER NOT NULL,
        normal_bots INTEGER NOT NULL,
        hard_bots INTEGER NOT NULL,
        crazy_bots INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS memberships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game_id TEXT NOT NULL REFERENCES games(game_id),
        player_id TEXT NOT NULL REFERENCES players(player_id),
        tribe TEXT NOT NULL,
        UNIQUE(game_id, player_id)
    );
";

/// Process-wide handle to the lobby database.
///
/// Open it once at startup, share it behind an `Arc`, and call
/// [`close`](Self::close) on shutdown to flush the connection.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database file at `path` and makes sure the
    /// three tables exist. `":memory:"` opens a private in-memory
    /// database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        tracing::info!(path = %path.display(), "opened lobby database");
        Self::with_connection(conn)
    }

    /// Opens a fresh in-memory database. Used by tests and by servers
    /// that don't need state to survive a restart.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("lobby tables ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside a single SQLite transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    /// The error type is the caller's, as long as store errors convert
    /// into it.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tables<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let out = f(&Tables { conn: &tx })?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    /// Flushes and closes the connection.
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        tracing::info!("closed lobby database");
        Ok(())
    }
}

/// Typed access to the three relations inside one transaction.
pub struct Tables<'c> {
    conn: &'c Connection,
}

impl<'c> Tables<'c> {
    /// The identity relation: player id → display name.
    pub fn players(&self) -> Players<'c> {
        Players::new(self.conn)
    }

    /// The game relation: game id → configuration record.
    pub fn games(&self) -> Games<'c> {
        Games::new(self.conn)
    }

    /// The membership relation between games and players.
    pub fn memberships(&self) -> Memberships<'c> {
        Memberships::new(self.conn)
    }

    /// Raw access for tests that need to plant rows the typed API refuses.
    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> &'c Connection {
        self.conn
    }
}
