//! `game.map` (terrain grid and gateways) and `ttypes.ttp` (terrain type table).

use mapforge_shared::{
    ELEVATION_SCALE, Gateway, MAP_MAX_AREA, MAX_TILE_TEXTURES, MapData, MapTile, OutputFormat,
    TerrainType, TerrainTypeTable,
};

use super::{
    check_trailing_bytes, decode_resource, encode_resource, open_for_encode, read_header,
    write_header,
};
use crate::codec::{Advisory, Decoded, FileLoad};
use crate::error::{BinaryDecodeError, BinaryEncodeError};
use crate::io::{IoProvider, MapStream, MapStreamExt};
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;

const MAP_TAG: &[u8; 4] = b"map ";
const TERRAIN_TYPES_TAG: &[u8; 4] = b"ttyp";

/// Oldest readable terrain file version.
pub const MAP_DATA_MIN_VERSION: u32 = 10;
/// Newest readable terrain file version.
pub const MAP_DATA_MAX_VERSION: u32 = 39;
/// The only gateway block version.
pub const GATEWAY_VERSION: u32 = 1;

const TERRAIN_TYPES_MIN_VERSION: u32 = 7;
const TERRAIN_TYPES_MAX_VERSION: u32 = 39;

/// Largest tile height a byte-sized legacy height can carry.
const LEGACY_MAX_HEIGHT: u16 = u8::MAX as u16 * ELEVATION_SCALE;

/// Decode the terrain grid and gateway list.
pub fn load_map_data(path: &str, io: &dyn IoProvider, logger: &dyn MapLogger) -> Decoded<MapData> {
    decode_resource(path, io, logger, read_map_data)
}

fn read_map_data(
    stream: &mut dyn MapStream,
    advisory: Advisory<'_>,
) -> Result<FileLoad<MapData>, BinaryDecodeError> {
    // Only "map" is significant; the fourth byte has never been checked.
    let (version, width) = read_header(stream, MAP_TAG, 3)?;
    let height = stream.read_u32().ok_or(BinaryDecodeError::BadHeader)?;

    if version < MAP_DATA_MIN_VERSION {
        return Err(BinaryDecodeError::UnsupportedVersion { kind: "map", version });
    }
    if version > MAP_DATA_MAX_VERSION {
        return Err(BinaryDecodeError::UndefinedVersion { kind: "map", version });
    }

    let area = u64::from(width) * u64::from(height);
    if area > MAP_MAX_AREA {
        return Err(BinaryDecodeError::MapTooLarge { width, height });
    }
    if width <= 1 || height <= 1 {
        return Err(BinaryDecodeError::MapTooSmall { width, height });
    }

    let mut tiles = Vec::with_capacity(area as usize);
    for index in 0..area as u32 {
        let texture = stream
            .read_u16()
            .ok_or(BinaryDecodeError::TruncatedTile(index))?;
        let raw_height = stream
            .read_u8()
            .ok_or(BinaryDecodeError::TruncatedTile(index))?;
        tiles.push(MapTile {
            height: u16::from(raw_height) * ELEVATION_SCALE,
            texture,
        });
    }

    let gateway_version = stream.read_u32();
    let gateway_count = stream.read_u32();
    let (Some(GATEWAY_VERSION), Some(gateway_count)) = (gateway_version, gateway_count) else {
        return Err(BinaryDecodeError::BadGatewayHeader);
    };

    let mut gateways = Vec::new();
    for index in 0..gateway_count {
        let [x1, y1, x2, y2] = stream
            .read_array::<4>()
            .ok_or(BinaryDecodeError::TruncatedGateway(index))?;
        gateways.push(Gateway { x1, y1, x2, y2 });
    }

    check_trailing_bytes(stream, advisory);

    Ok(FileLoad::new(
        MapData {
            width,
            height,
            tiles,
            gateways,
        },
        version,
    ))
}

/// Encode the terrain grid and gateways at the terrain version chosen by `format`.
pub fn write_map_data(
    map: &MapData,
    path: &str,
    io: &dyn IoProvider,
    format: OutputFormat,
    logger: &dyn MapLogger,
) -> bool {
    encode_resource(path, logger, || encode_map_data(map, path, io, format, logger))
}

fn encode_map_data(
    map: &MapData,
    path: &str,
    io: &dyn IoProvider,
    format: OutputFormat,
    logger: &dyn MapLogger,
) -> Result<(), BinaryEncodeError> {
    if !map.has_valid_dimensions() {
        return Err(BinaryEncodeError::InvalidDimensions {
            width: map.width,
            height: map.height,
        });
    }
    if map.tile_count() != map.tiles.len() as u64 {
        return Err(BinaryEncodeError::TileCountMismatch {
            width: map.width,
            height: map.height,
            tiles: map.tiles.len(),
        });
    }
    if let Some(tile) = map.tiles.iter().find(|t| t.height > LEGACY_MAX_HEIGHT) {
        return Err(BinaryEncodeError::TileTooHigh {
            height: tile.height,
            max: LEGACY_MAX_HEIGHT,
        });
    }

    let mut stream = open_for_encode(path, io, logger)?;

    let stream = &mut *stream;
    write_header(stream, MAP_TAG, format.terrain_version(), map.width)
        .and_then(|_| stream.write_u32(map.height))
        .ok_or(BinaryEncodeError::WriteFailed)?;

    for tile in &map.tiles {
        stream
            .write_u16(tile.texture)
            .and_then(|_| stream.write_u8((tile.height / ELEVATION_SCALE) as u8))
            .ok_or(BinaryEncodeError::WriteFailed)?;
    }

    stream
        .write_u32(GATEWAY_VERSION)
        .and_then(|_| stream.write_u32(map.gateways.len() as u32))
        .ok_or(BinaryEncodeError::WriteFailed)?;

    for gw in &map.gateways {
        let in_bounds = [gw.x1, gw.x2].iter().all(|&x| u32::from(x) < map.width)
            && [gw.y1, gw.y2].iter().all(|&y| u32::from(y) < map.height);
        if !gw.is_axis_aligned() || !in_bounds {
            map_log!(
                logger,
                LogLevel::Warning,
                "Invalid gateway coordinates ({}, {}, {}, {})",
                gw.x1,
                gw.y1,
                gw.x2,
                gw.y2
            );
        }
        stream
            .write_all_bytes(&[gw.x1, gw.y1, gw.x2, gw.y2])
            .ok_or(BinaryEncodeError::WriteFailed)?;
    }

    stream.finish().ok_or(BinaryEncodeError::WriteFailed)
}

/// Decode the terrain type table.
pub fn load_terrain_types(
    path: &str,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<TerrainTypeTable> {
    decode_resource(path, io, logger, read_terrain_types)
}

fn read_terrain_types(
    stream: &mut dyn MapStream,
    advisory: Advisory<'_>,
) -> Result<FileLoad<TerrainTypeTable>, BinaryDecodeError> {
    let (version, count) = read_header(stream, TERRAIN_TYPES_TAG, 4)?;
    if !(TERRAIN_TYPES_MIN_VERSION..=TERRAIN_TYPES_MAX_VERSION).contains(&version) {
        return Err(BinaryDecodeError::UnsupportedVersion {
            kind: "terrain type",
            version,
        });
    }

    let count = (count as usize).min(MAX_TILE_TEXTURES - 1);
    let mut types = Vec::with_capacity(count);
    for index in 0..count {
        let value = stream
            .read_u16()
            .ok_or(BinaryDecodeError::TruncatedRecord {
                kind: "terrain type",
                index: index as u32,
            })?;
        let terrain = TerrainType::try_from(value)
            .map_err(|_| BinaryDecodeError::TerrainTypeOutOfRange { index, value })?;
        types.push(terrain);
    }

    check_trailing_bytes(stream, advisory);

    Ok(FileLoad::new(TerrainTypeTable::new(types), version))
}

/// Encode the terrain type table. Exactly the table's entries are written.
pub fn write_terrain_types(
    table: &TerrainTypeTable,
    path: &str,
    io: &dyn IoProvider,
    format: OutputFormat,
    logger: &dyn MapLogger,
) -> bool {
    encode_resource(path, logger, || {
        encode_terrain_types(table, path, io, format, logger)
    })
}

fn encode_terrain_types(
    table: &TerrainTypeTable,
    path: &str,
    io: &dyn IoProvider,
    format: OutputFormat,
    logger: &dyn MapLogger,
) -> Result<(), BinaryEncodeError> {
    if table.len() >= MAX_TILE_TEXTURES {
        return Err(BinaryEncodeError::TooManyRecords {
            kind: "terrain type",
            count: table.len(),
        });
    }

    let mut stream = open_for_encode(path, io, logger)?;

    let stream = &mut *stream;
    write_header(
        stream,
        TERRAIN_TYPES_TAG,
        format.terrain_version(),
        table.len() as u32,
    )
    .ok_or(BinaryEncodeError::WriteFailed)?;

    for &terrain in &table.types {
        stream
            .write_u16(u16::from(terrain))
            .ok_or(BinaryEncodeError::WriteFailed)?;
    }

    stream.finish().ok_or(BinaryEncodeError::WriteFailed)
}
