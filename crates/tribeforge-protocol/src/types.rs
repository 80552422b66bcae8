//! Core value types shared by every Tribeforge layer.
//!
//! These are the nouns of the lobby: who a player is, which game they
//! are looking at, and what that game's configuration record holds.
//! The same types are persisted by the store and serialized on the wire,
//! so their string forms are part of the public contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque player identifier.
///
/// Players are anonymous: the identifier is the long-lived token the
/// client holds, so it is chosen outside the lobby and never changes.
/// `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An opaque game identifier, usually taken from a shared link.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Fixed enumerations
// ---------------------------------------------------------------------------

/// Declares a closed enumeration whose display name is also its persisted
/// and serialized form.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// The display name, e.g. for rendering or persistence.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ProtocolError::InvalidInput {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

named_enum! {
    /// The terrain layout of a generated map.
    MapType, "map type" {
        Dryland => "Dryland",
        Lakes => "Lakes",
        Pangea => "Pangea",
        Continents => "Continents",
        Archipelago => "Archipelago",
        WaterWorld => "Water World",
    }
}

named_enum! {
    /// How large the generated map is.
    MapSize, "map size" {
        Tiny => "Tiny",
        Small => "Small",
        Normal => "Normal",
    }
}

named_enum! {
    /// The faction a member plays. Repeats across members are allowed.
    Tribe, "tribe" {
        XinXi => "Xin-xi",
        Imperius => "Imperius",
        Bardur => "Bardur",
        Oumaji => "Oumaji",
        Kickoo => "Kickoo",
        Hoodrick => "Hoodrick",
        Luxidoor => "Luxidoor",
        Vengir => "Vengir",
        Zebasi => "Zebasi",
        AiMo => "Ai-Mo",
        Quetzali => "Quetzali",
        Yadakk => "Yadakk",
        Aquarion => "Aquarion",
        Elyrion => "Elyrion",
        Polaris => "Polaris",
        Cymanti => "Cymanti",
    }
}

named_enum! {
    /// Skill tier of a computer-controlled player.
    Difficulty, "bot difficulty" {
        Easy => "Easy",
        Normal => "Normal",
        Hard => "Hard",
        Crazy => "Crazy",
    }
}

// ---------------------------------------------------------------------------
// Game configuration record
// ---------------------------------------------------------------------------

/// How many bots of each difficulty fill the empty seats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct BotCounts {
    pub easy: u32,
    pub normal: u32,
    pub hard: u32,
    pub crazy: u32,
}

impl BotCounts {
    /// Total number of bots across all tiers.
    pub fn total(&self) -> u32 {
        self.easy + self.normal + self.hard + self.crazy
    }

    /// Counts one more bot of the given tier.
    pub fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Normal => self.normal += 1,
            Difficulty::Hard => self.hard += 1,
            Difficulty::Crazy => self.crazy += 1,
        }
    }
}

/// The full configuration record of a game.
///
/// Always replaced as a whole, never field by field: a generated record
/// is internally consistent with the member count it was drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameConfig {
    pub map_type: MapType,
    pub map_size: MapSize,
    pub bots: BotCounts,
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// One member of a game as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub tribe: Tribe,
}

/// Everything a client needs to render a game page.
///
/// `players` is in join order. The order is for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: GameId,
    pub config: GameConfig,
    pub players: Vec<PlayerEntry>,
}

// ---------------------------------------------------------------------------
// Quick randomizer
// ---------------------------------------------------------------------------

/// The choices offered to the one-off randomizer. Every list must hold at
/// least one value; draws only ever come from these lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Number of human players to draw tribes for.
    pub players: u32,
    pub map_types: Vec<MapType>,
    pub map_sizes: Vec<MapSize>,
    pub tribes: Vec<Tribe>,
    pub difficulties: Vec<Difficulty>,
}

/// A randomized setup that is not stored anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSetup {
    pub config: GameConfig,
    /// One tribe per human player, in player order.
    pub tribes: Vec<Tribe>,
}
