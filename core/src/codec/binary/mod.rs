//! Legacy binary codec.
//!
//! Every file starts with a 4-byte ASCII tag, a `u32` version and a `u32` count (the terrain
//! file stores width and height instead). Records follow back to back with no framing, so a
//! single short read invalidates the rest of the file.

mod objects;
mod terrain;

#[cfg(test)]
mod tests;

pub use objects::{
    DEFAULT_DROID_VERSION, DEFAULT_FEATURE_VERSION, DEFAULT_STRUCTURE_VERSION, load_droids,
    load_features, load_structures, write_droids, write_features, write_structures,
};
pub use terrain::{
    GATEWAY_VERSION, MAP_DATA_MAX_VERSION, MAP_DATA_MIN_VERSION, load_map_data,
    load_terrain_types, write_map_data, write_terrain_types,
};

use crate::codec::{Advisory, Decoded, FileLoad};
use crate::error::{BinaryDecodeError, BinaryEncodeError};
use crate::io::{IoProvider, MapStream, MapStreamExt};
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;
use mapforge_shared::{PLAYER_SCAVENGERS, is_valid_player};

/// Name buffer length for record versions up to 19.
pub const SHORT_NAME_LENGTH: usize = 40;
/// Name buffer length for later record versions.
pub const LONG_NAME_LENGTH: usize = 60;

/// Lowest slot scavengers ever occupied in binary files.
const MIN_SCAVENGER_SLOT: u32 = 7;

/// Open `path`, run `read` over it and report any failure once.
pub(crate) fn decode_resource<T>(
    path: &str,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
    read: impl FnOnce(&mut dyn MapStream, Advisory<'_>) -> Result<FileLoad<T>, BinaryDecodeError>,
) -> Decoded<T> {
    let Some(mut stream) = io.open_for_read(path) else {
        return Decoded::Absent;
    };
    map_log!(logger, LogLevel::Info, "Loading: {}", path);

    match read(&mut *stream, Advisory::new(path, logger)) {
        Ok(load) => Decoded::Loaded(load),
        Err(e) => {
            map_log!(logger, LogLevel::Error, "{}: {}", path, e);
            Decoded::Malformed
        }
    }
}

/// Run an encoder and report any failure once.
pub(crate) fn encode_resource(
    path: &str,
    logger: &dyn MapLogger,
    encode: impl FnOnce() -> Result<(), BinaryEncodeError>,
) -> bool {
    match encode() {
        Ok(()) => true,
        Err(e) => {
            map_log!(logger, LogLevel::Error, "{}: {}", path, e);
            false
        }
    }
}

/// Open `path` for writing and announce it.
pub(crate) fn open_for_encode(
    path: &str,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Result<Box<dyn MapStream>, BinaryEncodeError> {
    let stream = io
        .open_for_write(path)
        .ok_or(BinaryEncodeError::OpenFailed)?;
    map_log!(logger, LogLevel::Info, "Writing: {}", path);
    Ok(stream)
}

pub(crate) fn name_length(version: u32) -> usize {
    if version <= 19 {
        SHORT_NAME_LENGTH
    } else {
        LONG_NAME_LENGTH
    }
}

/// Read a tag, version and count. `compare` limits how many tag bytes must match.
pub(crate) fn read_header(
    stream: &mut dyn MapStream,
    tag: &[u8; 4],
    compare: usize,
) -> Result<(u32, u32), BinaryDecodeError> {
    let found = stream
        .read_array::<4>()
        .ok_or(BinaryDecodeError::BadHeader)?;
    if found[..compare] != tag[..compare] {
        return Err(BinaryDecodeError::BadHeader);
    }
    let version = stream.read_u32().ok_or(BinaryDecodeError::BadHeader)?;
    let count = stream.read_u32().ok_or(BinaryDecodeError::BadHeader)?;
    Ok((version, count))
}

pub(crate) fn write_header(
    stream: &mut dyn MapStream,
    tag: &[u8; 4],
    version: u32,
    count: u32,
) -> Option<()> {
    stream.write_all_bytes(tag)?;
    stream.write_u32(version)?;
    stream.write_u32(count)
}

/// Read a fixed-size, NUL-padded name buffer.
pub(crate) fn read_name(stream: &mut dyn MapStream, length: usize) -> Option<String> {
    let mut buf = vec![0u8; length];
    stream.read_exact_bytes(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(length);
    Some(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Write `name` into a fixed-size buffer, truncating with a warning when it does not fit.
pub(crate) fn write_name(
    stream: &mut dyn MapStream,
    name: &str,
    length: usize,
    kind: &str,
    version: u32,
    logger: &dyn MapLogger,
) -> Option<()> {
    let bytes = name.as_bytes();
    if bytes.len() > length {
        map_log!(
            logger,
            LogLevel::Warning,
            "{}'s name exceeds the length supported by binary {} file version: {}; output will be truncated",
            kind,
            kind,
            version
        );
    }
    let mut buf = vec![0u8; length];
    let written = bytes.len().min(length);
    buf[..written].copy_from_slice(&bytes[..written]);
    stream.write_all_bytes(&buf)
}

/// Slot that stands for scavengers in binary files.
pub fn scavenger_slot(max_players: u32) -> u32 {
    max_players.max(MIN_SCAVENGER_SLOT)
}

/// Map a raw binary player onto the entity model.
pub(crate) fn player_from_binary(
    raw: u32,
    max_players: u32,
    advisory: Advisory<'_>,
    kind: &str,
    index: u32,
) -> i8 {
    if raw == scavenger_slot(max_players) {
        return PLAYER_SCAVENGERS;
    }
    let player = raw as i8;
    if !is_valid_player(player) {
        advisory.warning(format_args!("Invalid player({}) for {} {}", raw, kind, index));
    }
    player
}

pub(crate) fn player_to_binary(player: i8, max_players: u32) -> Result<u32, BinaryEncodeError> {
    match player {
        PLAYER_SCAVENGERS => Ok(scavenger_slot(max_players)),
        p if p < 0 => Err(BinaryEncodeError::InvalidPlayer(p)),
        p => Ok(p as u32),
    }
}

/// Degrees on disk to the 16-bit direction circle.
pub fn direction_from_degrees(degrees: u32) -> u16 {
    (u64::from(degrees) * 8192 / 45) as u16
}

/// 16-bit direction to whole degrees in `0..360`, rounded to nearest.
pub fn direction_to_degrees(direction: u16) -> u32 {
    ((u32::from(direction) * 45 + 4096) / 8192) % 360
}

/// Warn when bytes remain after the last record.
pub(crate) fn check_trailing_bytes(stream: &mut dyn MapStream, advisory: Advisory<'_>) {
    if !stream.at_end() {
        advisory.warning(format_args!(
            "Unexpectedly did not reach end of stream - data may be corrupted"
        ));
    }
}
