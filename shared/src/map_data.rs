//! Terrain grid and gateway model.

use serde::{Deserialize, Serialize};

use crate::constants::{MAP_MAX_AREA, TILE_NUMMASK};

/// One cell of the terrain grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapTile {
    /// World height of the tile's top-left corner.
    pub height: u16,
    /// Texture id: low bits select a terrain-type table entry, high bits are flip/rotation flags.
    pub texture: u16,
}

impl MapTile {
    /// Index into the terrain-type table.
    pub fn texture_number(&self) -> u16 {
        self.texture & TILE_NUMMASK
    }
}

/// Axis-aligned connector segment between two map regions, in tile coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gateway {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

impl Gateway {
    /// A gateway must be a horizontal or vertical line.
    pub fn is_axis_aligned(&self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }
}

/// Terrain grid plus gateways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` entries.
    pub tiles: Vec<MapTile>,
    pub gateways: Vec<Gateway>,
}

impl MapData {
    /// Number of tiles implied by the dimensions.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Both dimensions exceed one tile and the area fits the map limit.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width > 1 && self.height > 1 && self.tile_count() <= MAP_MAX_AREA
    }

    /// Tile at `(x, y)`, if inside the grid.
    pub fn tile(&self, x: u32, y: u32) -> Option<&MapTile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize)
    }
}
