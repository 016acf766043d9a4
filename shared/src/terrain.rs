//! Terrain-type lookup table.

use serde::{Deserialize, Serialize};

/// Surface category of a tile texture, used for movement and effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum TerrainType {
    #[default]
    Sand = 0,
    SandyBrush = 1,
    BakedEarth = 2,
    GreenMud = 3,
    RedBrush = 4,
    PinkRock = 5,
    Road = 6,
    Water = 7,
    CliffFace = 8,
    Rubble = 9,
    SheetIce = 10,
    Slush = 11,
}

/// Number of terrain types. Raw values above this are invalid.
pub const TER_MAX: u16 = 12;

/// Raw terrain-type value outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("terrain type {0} out of range (max {TER_MAX})")]
pub struct InvalidTerrainType(pub u16);

impl TryFrom<u16> for TerrainType {
    type Error = InvalidTerrainType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Sand,
            1 => Self::SandyBrush,
            2 => Self::BakedEarth,
            3 => Self::GreenMud,
            4 => Self::RedBrush,
            5 => Self::PinkRock,
            6 => Self::Road,
            7 => Self::Water,
            8 => Self::CliffFace,
            9 => Self::Rubble,
            10 => Self::SheetIce,
            11 => Self::Slush,
            other => return Err(InvalidTerrainType(other)),
        })
    }
}

impl From<TerrainType> for u16 {
    fn from(value: TerrainType) -> Self {
        value as u16
    }
}

/// Terrain type per texture number, indexed by [`crate::MapTile::texture_number`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTypeTable {
    pub types: Vec<TerrainType>,
}

impl TerrainTypeTable {
    pub fn new(types: Vec<TerrainType>) -> Self {
        Self { types }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Terrain type for a texture number.
    pub fn get(&self, texture_number: u16) -> Option<TerrainType> {
        self.types.get(usize::from(texture_number)).copied()
    }
}
