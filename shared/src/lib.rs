//! Shared map model for Mapforge.
//!
//! Plain data types produced by the codecs and the script sandbox in `mapforge-core`,
//! plus the constants that bound them.

pub mod constants;
pub mod formats;
pub mod ids;
pub mod map_data;
pub mod objects;
pub mod terrain;

pub use constants::*;
pub use formats::{MapType, OutputFormat};
pub use map_data::{Gateway, MapData, MapTile};
pub use objects::{Droid, Feature, MapObject, Structure, WorldPos, is_valid_player, largest_specified_id};
pub use terrain::{InvalidTerrainType, TER_MAX, TerrainType, TerrainTypeTable};
