//! Per-game mutual exclusion.
//!
//! Admitting a player is several store steps (check membership, insert,
//! count, rewrite the record). Two admissions to the same game must not
//! interleave, or both could size the bots from the same stale count.
//! Different games never wait on each other.
//!
//! Entries live only while someone holds or waits for them. The last
//! [`GameGuard`] to drop removes its game's entry, so ids that were tried
//! once (including ones that turned out not to exist) leave nothing
//! behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tribeforge_protocol::GameId;

/// One async mutex per game id that currently has holders or waiters.
#[derive(Default)]
pub(crate) struct GameLocks {
    locks: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one game. Dropping it releases the game and
/// prunes the entry if nobody else is waiting.
pub(crate) struct GameGuard<'a> {
    locks: &'a GameLocks,
    game_id: GameId,
    held: Option<OwnedMutexGuard<()>>,
}

impl GameLocks {
    /// Waits for exclusive access to `game_id`.
    pub(crate) async fn lock(&self, game_id: &GameId) -> GameGuard<'_> {
        let mutex = Arc::clone(self.entries().entry(game_id.clone()).or_default());
        let mut guard = GameGuard {
            locks: self,
            game_id: game_id.clone(),
            held: None,
        };
        // If this future is dropped while waiting, the pending lock (and
        // its handle on the entry) drops before `guard`, which then prunes.
        guard.held = Some(mutex.lock_owned().await);
        guard
    }

    /// Number of game ids with a live holder or waiter.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }

    fn entries(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<GameId, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GameGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut entries = self.locks.entries();
        if entries
            .get(&self.game_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            entries.remove(&self.game_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_game_is_exclusive() {
        let locks = GameLocks::default();
        let g = GameId::from("g1");

        let guard = locks.lock(&g).await;
        let second =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(&g)).await;
        assert!(second.is_err(), "second lock must wait for the first");

        drop(guard);
        let third =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(&g)).await;
        assert!(third.is_ok(), "lock must be free after the guard drops");
    }

    #[tokio::test]
    async fn test_different_games_do_not_block() {
        let locks = GameLocks::default();
        let _a = locks.lock(&GameId::from("a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(20),
            locks.lock(&GameId::from("b")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_when_last_guard_drops() {
        let locks = GameLocks::default();
        for i in 0..1000 {
            let _guard = locks.lock(&GameId(format!("g{i}"))).await;
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_entry_kept_while_a_waiter_is_queued() {
        let locks = Arc::new(GameLocks::default());
        let g = GameId::from("g1");
        let first = locks.lock(&g).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let g = g.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&g).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1, "the waiter still needs the entry");
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_wait_leaves_no_entry() {
        let locks = GameLocks::default();
        let g = GameId::from("g1");
        let first = locks.lock(&g).await;

        let gave_up =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(&g)).await;
        assert!(gave_up.is_err());

        drop(first);
        assert_eq!(locks.len(), 0);
    }
}
