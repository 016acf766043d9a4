//! Fixed limits and tile constants shared by every map format.
//!
//! These values are part of the on-disk contract: changing any of them changes which
//! maps load and what checksums they produce.

/// Maximum map width in tiles.
pub const MAP_MAX_WIDTH: u32 = 256;

/// Maximum map height in tiles.
pub const MAP_MAX_HEIGHT: u32 = 256;

/// Maximum number of tiles (`width * height`) in a map.
pub const MAP_MAX_AREA: u64 = MAP_MAX_WIDTH as u64 * MAP_MAX_HEIGHT as u64;

/// Maximum number of players in a game.
pub const MAX_PLAYERS: i8 = 11;

/// Player value identifying the scavenger (neutral, AI-controlled) faction.
pub const PLAYER_SCAVENGERS: i8 = -1;

/// World units per tile edge.
pub const TILE_UNITS: u32 = 128;

/// `log2(TILE_UNITS)`.
pub const TILE_SHIFT: u32 = 7;

/// Mask selecting the sub-tile part of a world coordinate.
pub const TILE_MASK: u32 = 0x7f;

/// Multiplier between legacy byte-sized tile heights and world heights.
pub const ELEVATION_SCALE: u16 = 2;

/// Maximum tile height representable by the supported terrain formats.
pub const TILE_MAX_HEIGHT: u16 = u8::MAX as u16 * ELEVATION_SCALE;

/// Maximum number of entries in a terrain-type table.
pub const MAX_TILE_TEXTURES: usize = 255;

// Tile texture id flag bits. Only the low `TILE_NUMMASK` bits index the terrain-type table.

/// Texture is mirrored horizontally.
pub const TILE_XFLIP: u16 = 0x8000;
/// Texture is mirrored vertically.
pub const TILE_YFLIP: u16 = 0x4000;
/// Texture rotation bits.
pub const TILE_ROTMASK: u16 = 0x3000;
/// Shift to extract the rotation from [`TILE_ROTMASK`].
pub const TILE_ROTSHIFT: u16 = 12;
/// Tile triangles are split along the other diagonal.
pub const TILE_TRIFLIP: u16 = 0x0800;
/// Texture number bits.
pub const TILE_NUMMASK: u16 = 0x01ff;

/// Maximum wall-clock time a map generation script may run, in seconds.
pub const MAX_MAPSCRIPT_RUNTIME_SECS: u64 = 30;
