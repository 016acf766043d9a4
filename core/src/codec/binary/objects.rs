//! `struct.bjo`, `dinit.bjo` and `feat.bjo`.
//!
//! All three share a common record prefix (name, id, position, direction, player and the
//! burn/fire fields). Structures append a long tail of runtime state, features append a
//! visibility block from version 14 onward.

use mapforge_shared::{Droid, Feature, Structure, TILE_MASK, TILE_UNITS, WorldPos};
use mapforge_shared::largest_specified_id;

use super::{
    check_trailing_bytes, decode_resource, direction_from_degrees, direction_to_degrees,
    encode_resource, name_length, open_for_encode, player_from_binary, player_to_binary,
    read_header, read_name, write_header, write_name,
};
use crate::codec::{Advisory, Decoded, FileLoad};
use crate::error::{BinaryDecodeError, BinaryEncodeError};
use crate::io::{IoProvider, MapStream, MapStreamExt};
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;

const STRUCTURE_TAG: &[u8; 4] = b"stru";
const DROID_TAG: &[u8; 4] = b"dint";
const FEATURE_TAG: &[u8; 4] = b"feat";

pub const DEFAULT_STRUCTURE_VERSION: u32 = 8;
pub const DEFAULT_DROID_VERSION: u32 = 8;
pub const DEFAULT_FEATURE_VERSION: u32 = 8;

const STRUCTURE_VERSIONS: std::ops::RangeInclusive<u32> = 7..=8;
const DROID_MAX_VERSION: u32 = 39;
const FEATURE_VERSIONS: std::ops::RangeInclusive<u32> = 7..=19;

/// First feature version carrying the per-player visibility block.
const FEATURE_VISIBILITY_VERSION: u32 = 14;
const VISIBILITY_BYTES: usize = 8;

/// Structure status meaning "fully built".
const STATUS_BUILT: u8 = 1;
/// Padding after the status byte, as emitted by older editors.
const STRUCTURE_PADDING: [u8; 3] = [26, 127, 0];
/// `body`, `armour`, `resistance`, `dummy1`, `subjectInc`, `timeStarted`, `output`,
/// `capacity`, `quantity`.
const STRUCTURE_TAIL_WORDS: usize = 9;
const STRUCTURE_CAPACITY_WORD: usize = 7;

/// Fields every object record starts with.
struct RecordPrefix {
    name: String,
    id: u32,
    x: u32,
    y: u32,
    direction: u32,
    player: u32,
    in_fire: i32,
    burn_start: u32,
    burn_damage: u32,
}

impl RecordPrefix {
    fn read(stream: &mut dyn MapStream, name_len: usize) -> Option<Self> {
        let name = read_name(stream, name_len)?;
        let id = stream.read_u32()?;
        let x = stream.read_u32()?;
        let y = stream.read_u32()?;
        let _z = stream.read_u32()?;
        let direction = stream.read_u32()?;
        let player = stream.read_u32()?;
        let in_fire = stream.read_i32()?;
        let burn_start = stream.read_u32()?;
        let burn_damage = stream.read_u32()?;
        Some(Self {
            name,
            id,
            x,
            y,
            direction,
            player,
            in_fire,
            burn_start,
            burn_damage,
        })
    }

    fn report_ignored(&self, advisory: Advisory<'_>, kind: &str, index: u32) {
        if self.in_fire != 0 {
            advisory.ignoring("inFire", self.in_fire, kind, index);
        }
        if self.burn_start != 0 {
            advisory.ignoring("burnStart", self.burn_start, kind, index);
        }
        if self.burn_damage != 0 {
            advisory.ignoring("burnDamage", self.burn_damage, kind, index);
        }
    }

    /// Zero is not a valid id; treat it as "not specified".
    fn id(&self) -> Option<u32> {
        (self.id != 0).then_some(self.id)
    }
}

/// Values written into a record prefix. The burn/fire fields are always zero.
struct PrefixOut<'a> {
    name: &'a str,
    id: u32,
    position: WorldPos,
    direction: u16,
    player: u32,
}

impl PrefixOut<'_> {
    fn write(
        &self,
        stream: &mut dyn MapStream,
        kind: &str,
        version: u32,
        logger: &dyn MapLogger,
    ) -> Option<()> {
        write_name(stream, self.name, name_length(version), kind, version, logger)?;
        stream.write_u32(self.id)?;
        stream.write_u32(self.position.x as u32)?;
        stream.write_u32(self.position.y as u32)?;
        stream.write_u32(0)?;
        stream.write_u32(direction_to_degrees(self.direction))?;
        stream.write_u32(self.player)?;
        stream.write_i32(0)?;
        stream.write_u32(0)?;
        stream.write_u32(0)
    }
}

/// Hands out ids for records that do not carry one, continuing after the largest present id.
struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    fn new(largest: u32) -> Self {
        Self {
            next: largest.wrapping_add(1),
        }
    }

    fn resolve(&mut self, id: Option<u32>) -> u32 {
        id.unwrap_or_else(|| {
            let id = self.next;
            self.next = self.next.wrapping_add(1);
            id
        })
    }
}

fn record_count(kind: &'static str, count: usize) -> Result<u32, BinaryEncodeError> {
    u32::try_from(count).map_err(|_| BinaryEncodeError::TooManyRecords { kind, count })
}

// ============================================================================
// Structures
// ============================================================================

/// Decode `struct.bjo`.
pub fn load_structures(
    path: &str,
    max_players: u32,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Structure>> {
    decode_resource(path, io, logger, |stream, advisory| {
        read_structures(stream, max_players, advisory)
    })
}

fn read_structures(
    stream: &mut dyn MapStream,
    max_players: u32,
    advisory: Advisory<'_>,
) -> Result<FileLoad<Vec<Structure>>, BinaryDecodeError> {
    const KIND: &str = "structure";

    let (version, count) = read_header(stream, STRUCTURE_TAG, 4)?;
    if !STRUCTURE_VERSIONS.contains(&version) {
        return Err(BinaryDecodeError::UnsupportedVersion { kind: KIND, version });
    }
    let name_len = name_length(version);

    let mut structures = Vec::new();
    for index in 0..count {
        let truncated = BinaryDecodeError::TruncatedRecord { kind: KIND, index };
        let prefix = RecordPrefix::read(stream, name_len).ok_or(truncated.clone())?;
        let status = stream.read_u8().ok_or(truncated.clone())?;
        stream.read_array::<3>().ok_or(truncated.clone())?;
        let _build_points = stream.read_i32().ok_or(truncated.clone())?;
        let mut tail = [0u32; STRUCTURE_TAIL_WORDS];
        for word in &mut tail {
            *word = stream.read_u32().ok_or(truncated.clone())?;
        }

        prefix.report_ignored(advisory, KIND, index);
        if status != STATUS_BUILT {
            advisory.ignoring("status", status, KIND, index);
        }
        let capacity = tail[STRUCTURE_CAPACITY_WORD];
        if capacity != 0 {
            advisory.ignoring("capacity", capacity, KIND, index);
        }

        structures.push(Structure {
            id: prefix.id(),
            name: prefix.name.clone(),
            position: WorldPos::new(prefix.x as i32, prefix.y as i32),
            direction: direction_from_degrees(prefix.direction),
            player: player_from_binary(prefix.player, max_players, advisory, KIND, index),
            modules: 0,
        });
    }

    check_trailing_bytes(stream, advisory);
    Ok(FileLoad::new(structures, version))
}

/// Encode `struct.bjo` at `version` (7 or 8).
pub fn write_structures(
    structures: &[Structure],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_resource(path, logger, || {
        encode_structures(structures, max_players, path, io, version, logger)
    })
}

fn encode_structures(
    structures: &[Structure],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> Result<(), BinaryEncodeError> {
    const KIND: &str = "structure";

    if !STRUCTURE_VERSIONS.contains(&version) {
        return Err(BinaryEncodeError::UnsupportedVersion { kind: KIND, version });
    }
    let count = record_count(KIND, structures.len())?;
    let players = structures
        .iter()
        .map(|s| player_to_binary(s.player, max_players))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stream = open_for_encode(path, io, logger)?;
    let stream = &mut *stream;
    write_header(stream, STRUCTURE_TAG, version, count).ok_or(BinaryEncodeError::WriteFailed)?;

    let mut ids = IdAllocator::new(largest_specified_id(structures));
    for (structure, player) in structures.iter().zip(players) {
        if structure.modules > 0 {
            map_log!(
                logger,
                LogLevel::Warning,
                "Structure modules ({}) > 0. Conversion to old binary struct format (version: {}) may be missing the modules.",
                structure.modules,
                version
            );
        }

        let prefix = PrefixOut {
            name: &structure.name,
            id: ids.resolve(structure.id),
            position: structure.position,
            direction: structure.direction,
            player,
        };
        prefix
            .write(stream, KIND, version, logger)
            .and_then(|_| stream.write_u8(STATUS_BUILT))
            .and_then(|_| stream.write_all_bytes(&STRUCTURE_PADDING))
            .and_then(|_| stream.write_i32(0))
            .and_then(|_| stream.write_all_bytes(&[0u8; STRUCTURE_TAIL_WORDS * 4]))
            .ok_or(BinaryEncodeError::WriteFailed)?;
    }

    stream.finish().ok_or(BinaryEncodeError::WriteFailed)
}

// ============================================================================
// Droids
// ============================================================================

/// Decode `dinit.bjo`.
pub fn load_droids(
    path: &str,
    max_players: u32,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Droid>> {
    decode_resource(path, io, logger, |stream, advisory| {
        read_droids(stream, max_players, advisory)
    })
}

/// Snap a legacy droid coordinate to the centre of its tile.
fn tile_centre(coord: u32) -> i32 {
    ((coord & !TILE_MASK) + TILE_UNITS / 2) as i32
}

fn read_droids(
    stream: &mut dyn MapStream,
    max_players: u32,
    advisory: Advisory<'_>,
) -> Result<FileLoad<Vec<Droid>>, BinaryDecodeError> {
    const KIND: &str = "droid";

    // No upper version bound has ever been enforced for droid files.
    let (version, count) = read_header(stream, DROID_TAG, 4)?;
    let name_len = name_length(version);

    let mut droids = Vec::new();
    for index in 0..count {
        let prefix = RecordPrefix::read(stream, name_len)
            .ok_or(BinaryDecodeError::TruncatedRecord { kind: KIND, index })?;
        prefix.report_ignored(advisory, KIND, index);

        droids.push(Droid {
            id: prefix.id(),
            name: prefix.name.clone(),
            position: WorldPos::new(tile_centre(prefix.x), tile_centre(prefix.y)),
            direction: direction_from_degrees(prefix.direction),
            player: player_from_binary(prefix.player, max_players, advisory, KIND, index),
        });
    }

    check_trailing_bytes(stream, advisory);
    Ok(FileLoad::new(droids, version))
}

/// Encode `dinit.bjo` at `version` (at most 39).
pub fn write_droids(
    droids: &[Droid],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_resource(path, logger, || {
        encode_droids(droids, max_players, path, io, version, logger)
    })
}

fn encode_droids(
    droids: &[Droid],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> Result<(), BinaryEncodeError> {
    const KIND: &str = "droid";

    if version > DROID_MAX_VERSION {
        return Err(BinaryEncodeError::UnsupportedVersion { kind: KIND, version });
    }
    let count = record_count(KIND, droids.len())?;
    let players = droids
        .iter()
        .map(|d| player_to_binary(d.player, max_players))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stream = open_for_encode(path, io, logger)?;
    let stream = &mut *stream;
    write_header(stream, DROID_TAG, version, count).ok_or(BinaryEncodeError::WriteFailed)?;

    let mut ids = IdAllocator::new(largest_specified_id(droids));
    for (droid, player) in droids.iter().zip(players) {
        PrefixOut {
            name: &droid.name,
            id: ids.resolve(droid.id),
            position: droid.position,
            direction: droid.direction,
            player,
        }
        .write(stream, KIND, version, logger)
        .ok_or(BinaryEncodeError::WriteFailed)?;
    }

    stream.finish().ok_or(BinaryEncodeError::WriteFailed)
}

// ============================================================================
// Features
// ============================================================================

/// Decode `feat.bjo`. The stored player is never used; decoded features have no owner.
pub fn load_features(
    path: &str,
    max_players: u32,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Feature>> {
    decode_resource(path, io, logger, |stream, advisory| {
        read_features(stream, max_players, advisory)
    })
}

fn read_features(
    stream: &mut dyn MapStream,
    max_players: u32,
    advisory: Advisory<'_>,
) -> Result<FileLoad<Vec<Feature>>, BinaryDecodeError> {
    const KIND: &str = "feature";

    let (version, count) = read_header(stream, FEATURE_TAG, 4)?;
    if !FEATURE_VERSIONS.contains(&version) {
        return Err(BinaryDecodeError::UnsupportedVersion { kind: KIND, version });
    }
    let name_len = name_length(version);
    let has_visibility = version >= FEATURE_VISIBILITY_VERSION;

    let mut features = Vec::new();
    for index in 0..count {
        let truncated = BinaryDecodeError::TruncatedRecord { kind: KIND, index };
        let prefix = RecordPrefix::read(stream, name_len).ok_or(truncated.clone())?;
        let visibility = if has_visibility {
            stream
                .read_array::<VISIBILITY_BYTES>()
                .ok_or(truncated.clone())?
        } else {
            [0u8; VISIBILITY_BYTES]
        };

        if prefix.player != max_players {
            advisory.ignoring("player", prefix.player, KIND, index);
        }
        prefix.report_ignored(advisory, KIND, index);
        for (slot, &seen) in visibility.iter().enumerate() {
            if seen != 0 {
                advisory.warning(format_args!(
                    "Ignoring non-0 visibility[{}]={} for {} {}",
                    slot, seen, KIND, index
                ));
            }
        }

        features.push(Feature {
            id: prefix.id(),
            name: prefix.name.clone(),
            position: WorldPos::new(prefix.x as i32, prefix.y as i32),
            direction: direction_from_degrees(prefix.direction),
            player: None,
        });
    }

    check_trailing_bytes(stream, advisory);
    Ok(FileLoad::new(features, version))
}

/// Encode `feat.bjo` at `version` (7 to 19).
pub fn write_features(
    features: &[Feature],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_resource(path, logger, || {
        encode_features(features, max_players, path, io, version, logger)
    })
}

fn encode_features(
    features: &[Feature],
    max_players: u32,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> Result<(), BinaryEncodeError> {
    const KIND: &str = "feature";

    if !FEATURE_VERSIONS.contains(&version) {
        return Err(BinaryEncodeError::UnsupportedVersion { kind: KIND, version });
    }
    let count = record_count(KIND, features.len())?;
    let players = features
        .iter()
        .map(|f| match f.player {
            Some(player) => player_to_binary(player, max_players),
            None => Ok(max_players),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stream = open_for_encode(path, io, logger)?;
    let stream = &mut *stream;
    write_header(stream, FEATURE_TAG, version, count).ok_or(BinaryEncodeError::WriteFailed)?;

    let mut ids = IdAllocator::new(largest_specified_id(features));
    for (feature, player) in features.iter().zip(players) {
        PrefixOut {
            name: &feature.name,
            id: ids.resolve(feature.id),
            position: feature.position,
            direction: feature.direction,
            player,
        }
        .write(stream, KIND, version, logger)
        .ok_or(BinaryEncodeError::WriteFailed)?;

        if version >= FEATURE_VISIBILITY_VERSION {
            stream
                .write_all_bytes(&[0u8; VISIBILITY_BYTES])
                .ok_or(BinaryEncodeError::WriteFailed)?;
        }
    }

    stream.finish().ok_or(BinaryEncodeError::WriteFailed)
}
