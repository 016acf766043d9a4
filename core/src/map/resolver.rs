//! Per-kind resolution: an ordered list of codec attempts and a memo slot per entity kind.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::codec::{self, Decoded, binary, json};
use crate::io::IoProvider;
use crate::logging::MapLogger;
use mapforge_shared::{Droid, Feature, MapData, MapType, Structure, TerrainTypeTable};

/// Which codec family produced a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Binary,
    Json,
    ScriptGenerated,
}

/// Codec family and declared version of one resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadedFileVersion {
    pub file_type: FileType,
    pub version: u32,
}

impl LoadedFileVersion {
    pub fn new(file_type: FileType, version: u32) -> Self {
        Self { file_type, version }
    }
}

/// The logical files a map consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapFile {
    MapData,
    TerrainTypes,
    Structures,
    Droids,
    Features,
}

/// Overall generation a fully resolved map was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadedFormat {
    /// Every object file was legacy binary.
    BinaryOld,
    JsonV1,
    JsonV2,
    /// Object files came from different codecs or JSON versions.
    Mixed,
    ScriptGenerated,
}

/// Memoized result of one resolution. A failed resolution is remembered too.
#[derive(Debug, Clone)]
pub(crate) enum Memo<T> {
    Pending,
    Resolved(Option<T>),
}

impl<T> Memo<T> {
    pub(crate) fn ready(value: T) -> Self {
        Self::Resolved(Some(value))
    }

    /// Resolve on first use; later calls return the stored outcome.
    pub(crate) fn get_or_resolve(&mut self, resolve: impl FnOnce() -> Option<T>) -> Option<&T> {
        if let Self::Pending = self {
            *self = Self::Resolved(resolve());
        }
        match self {
            Self::Resolved(value) => value.as_ref(),
            Self::Pending => None,
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => value.as_ref(),
            Self::Pending => None,
        }
    }
}

/// Everything a decoder needs besides the resource path.
pub(crate) struct LoadContext<'a> {
    pub map_type: MapType,
    pub max_players: u32,
    pub io: &'a dyn IoProvider,
    pub logger: &'a dyn MapLogger,
}

/// One entry of a resolution order.
pub(crate) struct CodecAttempt<T> {
    pub file_type: FileType,
    pub resource: &'static str,
    pub decode: fn(&LoadContext<'_>, &str) -> Decoded<T>,
}

pub(crate) const MAP_DATA_ATTEMPTS: &[CodecAttempt<MapData>] = &[CodecAttempt {
    file_type: FileType::Binary,
    resource: codec::MAP_DATA_FILE,
    decode: |cx, path| binary::load_map_data(path, cx.io, cx.logger),
}];

pub(crate) const TERRAIN_TYPE_ATTEMPTS: &[CodecAttempt<TerrainTypeTable>] = &[CodecAttempt {
    file_type: FileType::Binary,
    resource: codec::TERRAIN_TYPES_FILE,
    decode: |cx, path| binary::load_terrain_types(path, cx.io, cx.logger),
}];

pub(crate) const STRUCTURE_ATTEMPTS: &[CodecAttempt<Vec<Structure>>] = &[
    CodecAttempt {
        file_type: FileType::Json,
        resource: codec::STRUCTURES_JSON_FILE,
        decode: |cx, path| json::load_structures(path, cx.map_type, cx.io, cx.logger),
    },
    CodecAttempt {
        file_type: FileType::Binary,
        resource: codec::STRUCTURES_BINARY_FILE,
        decode: |cx, path| binary::load_structures(path, cx.max_players, cx.io, cx.logger),
    },
];

pub(crate) const DROID_ATTEMPTS: &[CodecAttempt<Vec<Droid>>] = &[
    CodecAttempt {
        file_type: FileType::Json,
        resource: codec::DROIDS_JSON_FILE,
        decode: |cx, path| json::load_droids(path, cx.map_type, cx.io, cx.logger),
    },
    CodecAttempt {
        file_type: FileType::Binary,
        resource: codec::DROIDS_BINARY_FILE,
        decode: |cx, path| binary::load_droids(path, cx.max_players, cx.io, cx.logger),
    },
];

pub(crate) const FEATURE_ATTEMPTS: &[CodecAttempt<Vec<Feature>>] = &[
    CodecAttempt {
        file_type: FileType::Json,
        resource: codec::FEATURES_JSON_FILE,
        decode: |cx, path| json::load_features(path, cx.map_type, cx.io, cx.logger),
    },
    CodecAttempt {
        file_type: FileType::Binary,
        resource: codec::FEATURES_BINARY_FILE,
        decode: |cx, path| binary::load_features(path, cx.max_players, cx.io, cx.logger),
    },
];

/// Try each attempt in order until one loads. Absent and malformed files both fall through.
pub(crate) fn resolve<T>(
    attempts: &[CodecAttempt<T>],
    folder: &str,
    cx: &LoadContext<'_>,
    file: MapFile,
    versions: &mut HashMap<MapFile, LoadedFileVersion>,
) -> Option<T> {
    for attempt in attempts {
        let path = cx.io.path_join(folder, attempt.resource);
        if let Decoded::Loaded(load) = (attempt.decode)(cx, &path) {
            versions.insert(file, LoadedFileVersion::new(attempt.file_type, load.version));
            return Some(load.value);
        }
    }
    None
}

/// Classify a map from the versions of its object files.
///
/// The `game.map` version is not consulted. Map data is read and written at terrain version 39
/// at most, so a JSON v2 map is never paired with the newer map data it would otherwise require.
pub(crate) fn classify(versions: &HashMap<MapFile, LoadedFileVersion>) -> Option<LoadedFormat> {
    let object_files = [MapFile::Structures, MapFile::Droids, MapFile::Features];
    let loaded = object_files
        .iter()
        .map(|file| versions.get(file).copied())
        .collect::<Option<Vec<_>>>()?;

    let first = *loaded.first()?;
    if loaded.iter().any(|v| v.file_type != first.file_type) {
        return Some(LoadedFormat::Mixed);
    }
    match first.file_type {
        FileType::ScriptGenerated => Some(LoadedFormat::ScriptGenerated),
        FileType::Binary => Some(LoadedFormat::BinaryOld),
        FileType::Json if loaded.iter().any(|v| v.version != first.version) => {
            Some(LoadedFormat::Mixed)
        }
        FileType::Json => match first.version {
            1 => Some(LoadedFormat::JsonV1),
            2 => Some(LoadedFormat::JsonV2),
            _ => None,
        },
    }
}
