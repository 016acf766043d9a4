//! Map classification and output format selection.

use serde::{Deserialize, Serialize};

/// What kind of game a map is loaded for. Affects how players are written to JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapType {
    Campaign,
    Savegame,
    #[default]
    Skirmish,
}

/// On-disk generation to write when exporting a map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Legacy fixed-layout binary objects.
    BinaryOld,
    /// Keyed JSON objects without a version marker.
    JsonV1,
    /// Versioned JSON with object arrays.
    #[default]
    JsonV2,
}

impl OutputFormat {
    /// Terrain file version written alongside this format.
    pub fn terrain_version(self) -> u32 {
        match self {
            Self::BinaryOld => 10,
            Self::JsonV1 | Self::JsonV2 => 39,
        }
    }

    /// JSON schema generation, or `None` for binary output.
    pub fn json_version(self) -> Option<u32> {
        match self {
            Self::BinaryOld => None,
            Self::JsonV1 => Some(1),
            Self::JsonV2 => Some(2),
        }
    }
}
