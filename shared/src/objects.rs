//! Placed map objects: structures, droids and features.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PLAYERS, PLAYER_SCAVENGERS};

/// Position in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
}

impl WorldPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Returns true for the scavenger sentinel or an ordinary player slot.
pub fn is_valid_player(player: i8) -> bool {
    player == PLAYER_SCAVENGERS || (0..MAX_PLAYERS).contains(&player)
}

/// A building placed on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Non-zero when present; absent ids are generated by the game.
    pub id: Option<u32>,
    /// Structure template identifier.
    pub name: String,
    pub position: WorldPos,
    /// A full turn maps onto the whole 16-bit range.
    pub direction: u16,
    pub player: i8,
    /// Number of attached upgrade modules.
    pub modules: u8,
}

/// A mobile unit placed on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droid {
    pub id: Option<u32>,
    /// Droid template identifier.
    pub name: String,
    pub position: WorldPos,
    pub direction: u16,
    pub player: i8,
}

/// A static feature (trees, oil resources, wrecks).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: Option<u32>,
    pub name: String,
    pub position: WorldPos,
    pub direction: u16,
    /// Absent means "no owner"; only meaningful outside multiplayer.
    pub player: Option<i8>,
}

/// Fields common to every placed object.
pub trait MapObject {
    fn id(&self) -> Option<u32>;
    fn name(&self) -> &str;
    fn position(&self) -> WorldPos;
    fn direction(&self) -> u16;
}

macro_rules! impl_map_object {
    ($($ty:ty),*) => {
        $(
            impl MapObject for $ty {
                fn id(&self) -> Option<u32> {
                    self.id
                }
                fn name(&self) -> &str {
                    &self.name
                }
                fn position(&self) -> WorldPos {
                    self.position
                }
                fn direction(&self) -> u16 {
                    self.direction
                }
            }
        )*
    };
}

impl_map_object!(Structure, Droid, Feature);

/// Largest id present in a list of objects, or 0.
pub fn largest_specified_id<T: MapObject>(objects: &[T]) -> u32 {
    objects.iter().filter_map(MapObject::id).max().unwrap_or(0)
}
