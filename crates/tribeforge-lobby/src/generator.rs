//! Random game configuration and tribe assignment.
//!
//! Pure functions: every draw comes from the `Rng` the caller passes in,
//! nothing here touches the store. [`randomize`] is the one-off variant
//! that draws from a caller-chosen subset of each enumeration. Production code passes
//! `&mut rand::rng()`, tests pass a seeded `StdRng`.

use rand::Rng;
use tribeforge_protocol::{
    BotCounts, Difficulty, GameConfig, MapSize, MapType, RandomSetup, Selection,
    Tribe,
};

use crate::LobbyError;

/// How many bots a game needs so that members plus bots fill every seat.
/// Never negative: an over-full game gets zero bots.
pub fn bots_needed(total_seats: u32, occupied_seats: u32) -> u32 {
    total_seats.saturating_sub(occupied_seats)
}

/// Draws a complete configuration for a game with `occupied_seats`
/// members: uniform map type, uniform map size, and
/// `bots_needed(total_seats, occupied_seats)` bots.
pub fn generate_config<R: Rng>(
    rng: &mut R,
    total_seats: u32,
    occupied_seats: u32,
) -> GameConfig {
    GameConfig {
        map_type: pick(rng, MapType::ALL),
        map_size: pick(rng, MapSize::ALL),
        bots: generate_bots(rng, bots_needed(total_seats, occupied_seats)),
    }
}

/// Distributes `count` bots over the four difficulty tiers.
///
/// Each bot's tier is drawn independently and uniformly, so the split
/// varies from call to call but always sums to exactly `count`.
pub fn generate_bots<R: Rng>(rng: &mut R, count: u32) -> BotCounts {
    draw_bots(rng, count, Difficulty::ALL)
}

/// Draws one tribe uniformly. Independent per call; repeats are allowed.
pub fn generate_tribe<R: Rng>(rng: &mut R) -> Tribe {
    pick(rng, Tribe::ALL)
}

/// A fresh game id for links like `/g?id=...`: 16 lowercase hex chars.
pub fn generate_game_id<R: Rng>(rng: &mut R) -> String {
    random_hex(rng, 8)
}

/// A fresh client-held player token: 32 lowercase hex chars (128 bits).
pub fn generate_player_token<R: Rng>(rng: &mut R) -> String {
    random_hex(rng, 16)
}

/// Draws a one-off setup from the values in `selection`.
///
/// The bot count is uniform in `0..=bots_needed(total_seats, players)`,
/// each bot's tier and each player's tribe uniform over the chosen
/// values.
///
/// # Errors
/// [`LobbyError::InvalidInput`] if any list is empty or `players`
/// exceeds `total_seats`.
pub fn randomize<R: Rng>(
    rng: &mut R,
    total_seats: u32,
    selection: &Selection,
) -> Result<RandomSetup, LobbyError> {
    if selection.players > total_seats {
        return Err(LobbyError::InvalidInput(format!(
            "{} players do not fit in {total_seats} seats",
            selection.players
        )));
    }
    let map_types = non_empty(&selection.map_types, "map types")?;
    let map_sizes = non_empty(&selection.map_sizes, "map sizes")?;
    let tribes = non_empty(&selection.tribes, "tribes")?;
    let difficulties = non_empty(&selection.difficulties, "bot difficulties")?;

    let bot_count =
        rng.random_range(0..=bots_needed(total_seats, selection.players));
    Ok(RandomSetup {
        config: GameConfig {
            map_type: pick(rng, map_types),
            map_size: pick(rng, map_sizes),
            bots: draw_bots(rng, bot_count, difficulties),
        },
        tribes: (0..selection.players).map(|_| pick(rng, tribes)).collect(),
    })
}

fn non_empty<'a, T>(items: &'a [T], what: &str) -> Result<&'a [T], LobbyError> {
    if items.is_empty() {
        return Err(LobbyError::InvalidInput(format!("no {what} selected")));
    }
    Ok(items)
}

fn draw_bots<R: Rng>(rng: &mut R, count: u32, tiers: &[Difficulty]) -> BotCounts {
    let mut bots = BotCounts::default();
    for _ in 0..count {
        bots.add(pick(rng, tiers));
    }
    bots
}

fn pick<R: Rng, T: Copy>(rng: &mut R, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

fn random_hex<R: Rng>(rng: &mut R, bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rng.fill(&mut buf[..]);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}
