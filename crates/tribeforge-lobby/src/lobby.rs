//! The lobby coordinator: creates games on first access, admits players,
//! and keeps bot backfill in step with membership.
//!
//! # Game lifecycle
//!
//! ```text
//!   Unborn ──(ensure_game)──→ Open ──(admit_player / regenerate_*)──→ Open
//! ```
//!
//! There is no closed state. The invariant maintained for every open
//! game, after every operation here returns:
//!
//! ```text
//!   config.bots.total() + member_count == total_seats
//! ```
//!
//! (clamped: with more members than seats there are simply no bots).
//!
//! Every mutating operation takes the game's lock and
//! runs as ONE store transaction, so the check-then-act sequence is
//! neither interleaved with another request nor left half-written.

use std::sync::Arc;

use tribeforge_protocol::{
    GameConfig, GameId, GameView, PlayerId, RandomSetup, Selection, Tribe,
};
use tribeforge_store::{Store, StoreError, Tables};

use crate::generator::{
    bots_needed, generate_bots, generate_config, generate_tribe, randomize,
};
use crate::locks::GameLocks;
use crate::{DEFAULT_PLAYER_NAME, LobbyConfig, LobbyError};

/// What [`Lobby::admit_player`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The player was added with `tribe`; `config` is the record after
    /// the bots were recomputed.
    Joined { tribe: Tribe, config: GameConfig },

    /// The player was already a member. Nothing changed.
    AlreadyMember,
}

/// Orchestrates the player, game, and membership relations.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request
/// handler. The store handle it holds is the one opened at startup.
pub struct Lobby {
    store: Arc<Store>,
    config: LobbyConfig,
    locks: GameLocks,
}

impl Lobby {
    /// Creates a lobby over an already opened store.
    pub fn new(store: Arc<Store>, config: LobbyConfig) -> Self {
        Self {
            store,
            config,
            locks: GameLocks::default(),
        }
    }

    /// The lobby's settings.
    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // =====================================================================
    // Players
    // =====================================================================

    /// Creates the player with the default name if they are new.
    ///
    /// Returns `true` if a record was created.
    pub async fn ensure_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<bool, LobbyError> {
        let created = self
            .store
            .transaction(|t| {
                let players = t.players();
                if players.exists(player_id)? {
                    return Ok::<_, StoreError>(false);
                }
                players.create(player_id, DEFAULT_PLAYER_NAME)?;
                Ok(true)
            })
            .await?;
        if created {
            tracing::info!(%player_id, "created player");
        }
        Ok(created)
    }

    /// The player's display name.
    pub async fn player_name(
        &self,
        player_id: &PlayerId,
    ) -> Result<String, LobbyError> {
        let name = self
            .store
            .transaction(|t| t.players().name(player_id))
            .await?;
        Ok(name)
    }

    /// Changes the player's display name and returns the stored value.
    ///
    /// Surrounding whitespace is dropped.
    ///
    /// # Errors
    /// - [`LobbyError::InvalidInput`] if the name is blank
    /// - `NotFound` if the player doesn't exist
    pub async fn set_player_name(
        &self,
        player_id: &PlayerId,
        name: &str,
    ) -> Result<String, LobbyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LobbyError::InvalidInput("name cannot be empty".into()));
        }
        let previous = self
            .store
            .transaction(|t| t.players().set_name(player_id, name))
            .await?;
        tracing::info!(%player_id, from = %previous, to = name, "changed player name");
        Ok(name.to_string())
    }

    /// Games the player is a member of, oldest first.
    pub async fn player_games(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<GameId>, LobbyError> {
        let games = self
            .store
            .transaction(|t| t.memberships().games(player_id))
            .await?;
        Ok(games)
    }

    // =====================================================================
    // Games
    // =====================================================================

    /// Creates the game with a fresh configuration for zero members if it
    /// doesn't exist yet; otherwise leaves it untouched.
    ///
    /// Returns the game's current configuration either way.
    pub async fn ensure_game(
        &self,
        game_id: &GameId,
    ) -> Result<GameConfig, LobbyError> {
        let _guard = self.locks.lock(game_id).await;
        let config = self
            .store
            .transaction(|t| self.ensure_game_in(t, game_id))
            .await?;
        Ok(config)
    }

    /// Adds the player to the game with a random tribe, then recomputes
    /// the bots for the new member count.
    ///
    /// Joining twice is a no-op that returns [`Admission::AlreadyMember`].
    ///
    /// # Errors
    /// `NotFound` if the game (call [`ensure_game`](Self::ensure_game)
    /// first) or the player doesn't exist. Nothing is written in that
    /// case.
    pub async fn admit_player(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<Admission, LobbyError> {
        let _guard = self.locks.lock(game_id).await;
        let admission = self
            .store
            .transaction(|t| self.admit_player_in(t, game_id, player_id))
            .await?;
        Ok(admission)
    }

    /// [`ensure_game`](Self::ensure_game) then
    /// [`admit_player`](Self::admit_player) under one lock and one
    /// transaction, returning the resulting view. This is what opening a
    /// game link does.
    pub async fn open_game(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<GameView, LobbyError> {
        let _guard = self.locks.lock(game_id).await;
        let view = self
            .store
            .transaction(|t| {
                self.ensure_game_in(t, game_id)?;
                self.admit_player_in(t, game_id, player_id)?;
                view_in(t, game_id)
            })
            .await?;
        Ok(view)
    }

    /// Re-rolls only the bot distribution for the current member count.
    /// Map type, map size, and tribes are kept.
    pub async fn regenerate_bots(
        &self,
        game_id: &GameId,
    ) -> Result<GameConfig, LobbyError> {
        let _guard = self.locks.lock(game_id).await;
        let config = self
            .store
            .transaction(|t| self.regenerate_bots_in(t, game_id))
            .await?;
        Ok(config)
    }

    /// Reshuffles the whole game: a new map type, map size, and bot
    /// distribution for the current member count, and an independent new
    /// tribe for every member.
    pub async fn regenerate_all(
        &self,
        game_id: &GameId,
    ) -> Result<GameView, LobbyError> {
        let _guard = self.locks.lock(game_id).await;
        let view = self
            .store
            .transaction(|t| {
                let games = t.games();
                let memberships = t.memberships();
                if !games.exists(game_id)? {
                    return Err(StoreError::game_not_found(game_id));
                }

                let players = memberships.players(game_id)?;
                let members = u32::try_from(players.len()).unwrap_or(u32::MAX);
                let mut rng = rand::rng();
                let config =
                    generate_config(&mut rng, self.config.total_seats, members);
                games.replace(game_id, &config)?;
                for player_id in &players {
                    memberships.set_tribe(game_id, player_id, generate_tribe(&mut rng))?;
                }
                view_in(t, game_id)
            })
            .await?;
        tracing::info!(
            %game_id,
            members = view.players.len(),
            map_type = %view.config.map_type,
            map_size = %view.config.map_size,
            "regenerated game"
        );
        Ok(view)
    }

    /// The game's configuration with every member's name and tribe, in
    /// join order.
    pub async fn game_view(
        &self,
        game_id: &GameId,
    ) -> Result<GameView, LobbyError> {
        let view = self.store.transaction(|t| view_in(t, game_id)).await?;
        Ok(view)
    }

    /// Draws a one-off setup from `selection` for this lobby's seat count.
    /// Nothing is stored.
    pub fn randomize(&self, selection: &Selection) -> Result<RandomSetup, LobbyError> {
        randomize(&mut rand::rng(), self.config.total_seats, selection)
    }

    // =====================================================================
    // Transaction bodies (caller holds the game lock)
    // =====================================================================

    fn ensure_game_in(
        &self,
        t: &Tables<'_>,
        game_id: &GameId,
    ) -> Result<GameConfig, StoreError> {
        let games = t.games();
        if games.exists(game_id)? {
            return games.get(game_id);
        }
        let config =
            generate_config(&mut rand::rng(), self.config.total_seats, 0);
        games.create(game_id, &config)?;
        tracing::info!(
            %game_id,
            map_type = %config.map_type,
            map_size = %config.map_size,
            bots = config.bots.total(),
            "created game"
        );
        Ok(config)
    }

    fn admit_player_in(
        &self,
        t: &Tables<'_>,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<Admission, StoreError> {
        if !t.games().exists(game_id)? {
            return Err(StoreError::game_not_found(game_id));
        }
        let memberships = t.memberships();
        if memberships.contains(game_id, player_id)? {
            return Ok(Admission::AlreadyMember);
        }

        let tribe = generate_tribe(&mut rand::rng());
        memberships.add(game_id, player_id, tribe)?;
        let config = self.regenerate_bots_in(t, game_id)?;
        tracing::info!(%game_id, %player_id, %tribe, "admitted player");
        Ok(Admission::Joined { tribe, config })
    }

    fn regenerate_bots_in(
        &self,
        t: &Tables<'_>,
        game_id: &GameId,
    ) -> Result<GameConfig, StoreError> {
        let games = t.games();
        let mut config = games.get(game_id)?;
        let members = t.memberships().count(game_id)?;
        config.bots = generate_bots(
            &mut rand::rng(),
            bots_needed(self.config.total_seats, members),
        );
        games.replace(game_id, &config)?;
        tracing::info!(%game_id, members, bots = config.bots.total(), "regenerated bots");
        Ok(config)
    }
}

fn view_in(t: &Tables<'_>, game_id: &GameId) -> Result<GameView, StoreError> {
    Ok(GameView {
        game_id: game_id.clone(),
        config: t.games().get(game_id)?,
        players: t.memberships().roster(game_id)?,
    })
}
