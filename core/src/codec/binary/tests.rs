//! Tests for the legacy binary codec

use super::*;
use crate::io::MemoryIoProvider;
use crate::logging::LogLevel;
use crate::test_utils::{Bytes, RecordingLogger};
use mapforge_shared::{
    Droid, Feature, Gateway, MapData, MapTile, OutputFormat, PLAYER_SCAVENGERS, Structure,
    TerrainType, TerrainTypeTable, WorldPos,
};

fn map_file(version: u32, width: u32, height: u32) -> Bytes {
    let mut bytes = Bytes::new().tag(b"map ").u32(version).u32(width).u32(height);
    for i in 0..width * height {
        bytes = bytes.u16(i as u16).u8((i % 7) as u8);
    }
    bytes
}

fn structure_record(bytes: Bytes, name: &str, id: u32, player: u32) -> Bytes {
    bytes
        .name(name, SHORT_NAME_LENGTH)
        .u32(id)
        .u32(1088)
        .u32(2112)
        .u32(0)
        .u32(90)
        .u32(player)
        .i32(0)
        .u32(0)
        .u32(0)
        .u8(1)
        .raw(&[26, 127, 0])
        .i32(0)
        .raw(&[0u8; 36])
}

fn droid_record(bytes: Bytes, name: &str, id: u32, player: u32) -> Bytes {
    bytes
        .name(name, SHORT_NAME_LENGTH)
        .u32(id)
        .u32(1000)
        .u32(1100)
        .u32(0)
        .u32(180)
        .u32(player)
        .i32(0)
        .u32(0)
        .u32(0)
}

// ============================================================================
// Terrain
// ============================================================================

#[test]
fn test_load_map_data() {
    let io = MemoryIoProvider::new();
    let bytes = map_file(39, 4, 4)
        .u32(1)
        .u32(1)
        .raw(&[1, 2, 1, 3])
        .build();
    io.insert("game.map", bytes);
    let logger = RecordingLogger::new();

    let load = load_map_data("game.map", &io, &logger).loaded().unwrap();
    assert_eq!(load.version, 39);
    let map = load.value;
    assert_eq!((map.width, map.height), (4, 4));
    assert_eq!(map.tiles.len(), 16);
    assert_eq!(map.tiles[5], MapTile { height: 10, texture: 5 });
    assert_eq!(map.gateways, vec![Gateway { x1: 1, y1: 2, x2: 1, y2: 3 }]);
    assert_eq!(logger.count(LogLevel::Warning), 0);
    assert_eq!(logger.count(LogLevel::Error), 0);
}

#[test]
fn test_map_tag_fourth_byte_ignored() {
    let io = MemoryIoProvider::new();
    let mut bytes = map_file(10, 2, 2).u32(1).u32(0).build();
    bytes[3] = b'x';
    io.insert("game.map", bytes);
    let logger = RecordingLogger::new();
    assert!(load_map_data("game.map", &io, &logger).is_loaded());
}

#[test]
fn test_map_version_bounds() {
    let logger = RecordingLogger::new();
    for (version, expected) in [(9, "unsupported"), (40, "undefined")] {
        let io = MemoryIoProvider::new();
        io.insert("game.map", map_file(version, 2, 2).u32(1).u32(0).build());
        assert_eq!(load_map_data("game.map", &io, &logger), Decoded::Malformed);
        assert!(logger.contains(LogLevel::Error, expected));
    }
}

#[test]
fn test_map_dimension_limits() {
    let logger = RecordingLogger::new();
    let io = MemoryIoProvider::new();
    io.insert("small.map", Bytes::new().tag(b"map ").u32(39).u32(1).u32(8).build());
    io.insert("large.map", Bytes::new().tag(b"map ").u32(39).u32(257).u32(256).build());

    assert_eq!(load_map_data("small.map", &io, &logger), Decoded::Malformed);
    assert!(logger.contains(LogLevel::Error, "too small"));
    assert_eq!(load_map_data("large.map", &io, &logger), Decoded::Malformed);
    assert!(logger.contains(LogLevel::Error, "too large"));
}

#[test]
fn test_map_bad_gateway_block() {
    let io = MemoryIoProvider::new();
    io.insert("game.map", map_file(39, 2, 2).u32(2).u32(0).build());
    let logger = RecordingLogger::new();
    assert_eq!(load_map_data("game.map", &io, &logger), Decoded::Malformed);
    assert!(logger.contains(LogLevel::Error, "gateway"));
}

#[test]
fn test_map_truncated_tiles() {
    let io = MemoryIoProvider::new();
    let mut bytes = map_file(39, 4, 4).build();
    bytes.truncate(bytes.len() - 2);
    io.insert("game.map", bytes);
    let logger = RecordingLogger::new();
    assert_eq!(load_map_data("game.map", &io, &logger), Decoded::Malformed);
    assert_eq!(logger.count(LogLevel::Error), 1);
}

#[test]
fn test_missing_file_is_absent() {
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert_eq!(load_map_data("game.map", &io, &logger), Decoded::Absent);
    assert!(logger.entries().is_empty());
}

#[test]
fn test_write_map_data_versions() {
    let map = MapData {
        width: 2,
        height: 2,
        tiles: vec![MapTile { height: 20, texture: 3 }; 4],
        gateways: vec![Gateway { x1: 0, y1: 0, x2: 1, y2: 0 }],
    };
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();

    assert!(write_map_data(&map, "old.map", &io, OutputFormat::BinaryOld, &logger));
    assert!(write_map_data(&map, "new.map", &io, OutputFormat::JsonV2, &logger));

    let old = load_map_data("old.map", &io, &logger).loaded().unwrap();
    let new = load_map_data("new.map", &io, &logger).loaded().unwrap();
    assert_eq!(old.version, 10);
    assert_eq!(new.version, 39);
    assert_eq!(old.value, map);
    assert_eq!(new.value, map);
}

#[test]
fn test_write_map_data_rejects_bad_input() {
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();

    let short = MapData {
        width: 3,
        height: 3,
        tiles: vec![MapTile::default(); 8],
        gateways: Vec::new(),
    };
    assert!(!write_map_data(&short, "a.map", &io, OutputFormat::JsonV2, &logger));

    let tall = MapData {
        width: 2,
        height: 2,
        tiles: vec![MapTile { height: 511, texture: 0 }; 4],
        gateways: Vec::new(),
    };
    assert!(!write_map_data(&tall, "b.map", &io, OutputFormat::JsonV2, &logger));
    assert!(!io.contains("a.map"));
    assert!(!io.contains("b.map"));
    assert_eq!(logger.count(LogLevel::Error), 2);
}

#[test]
fn test_write_warns_on_bad_gateway() {
    let map = MapData {
        width: 2,
        height: 2,
        tiles: vec![MapTile::default(); 4],
        gateways: vec![Gateway { x1: 0, y1: 0, x2: 1, y2: 1 }, Gateway { x1: 5, y1: 0, x2: 5, y2: 1 }],
    };
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert!(write_map_data(&map, "game.map", &io, OutputFormat::JsonV2, &logger));
    assert_eq!(logger.count(LogLevel::Warning), 2);
}

// ============================================================================
// Terrain types
// ============================================================================

#[test]
fn test_terrain_types_round_trip() {
    let table = TerrainTypeTable::new(vec![
        TerrainType::Sand,
        TerrainType::Water,
        TerrainType::CliffFace,
        TerrainType::Slush,
    ]);
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert!(write_terrain_types(&table, "ttypes.ttp", &io, OutputFormat::JsonV2, &logger));
    let load = load_terrain_types("ttypes.ttp", &io, &logger).loaded().unwrap();
    assert_eq!(load.value, table);
    assert_eq!(io.get("ttypes.ttp").unwrap().len(), 12 + 4 * 2);
}

#[test]
fn test_terrain_type_out_of_range_fails() {
    let io = MemoryIoProvider::new();
    io.insert("ttypes.ttp", Bytes::new().tag(b"ttyp").u32(8).u32(2).u16(1).u16(13).build());
    let logger = RecordingLogger::new();
    assert_eq!(load_terrain_types("ttypes.ttp", &io, &logger), Decoded::Malformed);
}

#[test]
fn test_terrain_type_count_clamped() {
    let mut bytes = Bytes::new().tag(b"ttyp").u32(8).u32(300);
    for _ in 0..300 {
        bytes = bytes.u16(0);
    }
    let io = MemoryIoProvider::new();
    io.insert("ttypes.ttp", bytes.build());
    let logger = RecordingLogger::new();
    let load = load_terrain_types("ttypes.ttp", &io, &logger).loaded().unwrap();
    assert_eq!(load.value.len(), 254);
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn test_load_structures() {
    let bytes = Bytes::new().tag(b"stru").u32(8).u32(2);
    let bytes = structure_record(bytes, "A0CommandCentre", 12, 0);
    let bytes = structure_record(bytes, "A0BaBaFactory", 13, 7);
    let io = MemoryIoProvider::new();
    io.insert("struct.bjo", bytes.build());
    let logger = RecordingLogger::new();

    let load = load_structures("struct.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(load.version, 8);
    assert_eq!(
        load.value[0],
        Structure {
            id: Some(12),
            name: "A0CommandCentre".to_string(),
            position: WorldPos::new(1088, 2112),
            direction: 16384,
            player: 0,
            modules: 0,
        }
    );
    assert_eq!(load.value[1].player, PLAYER_SCAVENGERS);
    assert!(logger.messages(LogLevel::Warning).is_empty());
}

#[test]
fn test_structure_advisory_fields_warn() {
    let bytes = Bytes::new()
        .tag(b"stru")
        .u32(7)
        .u32(1)
        .name("A0LightFactory", SHORT_NAME_LENGTH)
        .u32(1)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(1)
        .i32(1)
        .u32(0)
        .u32(0)
        .u8(0)
        .raw(&[0, 0, 0])
        .i32(0)
        .raw(&[0u8; 28])
        .u32(2)
        .u32(0);
    let io = MemoryIoProvider::new();
    io.insert("struct.bjo", bytes.build());
    let logger = RecordingLogger::new();

    let load = load_structures("struct.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(load.value.len(), 1);
    assert!(logger.contains(LogLevel::Warning, "inFire(1)"));
    assert!(logger.contains(LogLevel::Warning, "status(0)"));
    assert!(logger.contains(LogLevel::Warning, "capacity(2)"));
}

#[test]
fn test_structure_unsupported_version() {
    let io = MemoryIoProvider::new();
    io.insert("struct.bjo", Bytes::new().tag(b"stru").u32(9).u32(0).build());
    let logger = RecordingLogger::new();
    assert_eq!(load_structures("struct.bjo", 4, &io, &logger), Decoded::Malformed);
}

#[test]
fn test_trailing_bytes_warn_but_succeed() {
    let clean = droid_record(Bytes::new().tag(b"dint").u32(8).u32(1), "ConstructorDroid", 3, 1);
    let dirty = clean.clone().raw(&[0xde, 0xad]);
    let io = MemoryIoProvider::new();
    io.insert("clean.bjo", clean.build());
    io.insert("dirty.bjo", dirty.build());
    let logger = RecordingLogger::new();

    let clean = load_droids("clean.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(logger.count(LogLevel::Warning), 0);
    let dirty = load_droids("dirty.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(clean.value, dirty.value);
    assert!(logger.contains(LogLevel::Warning, "did not reach end of stream"));
}

#[test]
fn test_droid_positions_snap_to_tile_centre() {
    let bytes = droid_record(Bytes::new().tag(b"dint").u32(8).u32(1), "Truck", 0, 2);
    let io = MemoryIoProvider::new();
    io.insert("dinit.bjo", bytes.build());
    let logger = RecordingLogger::new();

    let droid = &load_droids("dinit.bjo", 4, &io, &logger).loaded().unwrap().value[0];
    assert_eq!(droid.position, WorldPos::new(896 + 64, 1024 + 64));
    assert_eq!(droid.id, None);
    assert_eq!(droid.direction, direction_from_degrees(180));
}

#[test]
fn test_scavenger_slot_for_all_player_counts() {
    for max_players in 1..=10u32 {
        let slot = scavenger_slot(max_players);
        assert_eq!(slot, max_players.max(7));

        let bytes = droid_record(Bytes::new().tag(b"dint").u32(8).u32(1), "Bandit", 1, slot);
        let io = MemoryIoProvider::new();
        io.insert("dinit.bjo", bytes.build());
        let logger = RecordingLogger::new();
        let load = load_droids("dinit.bjo", max_players, &io, &logger).loaded().unwrap();
        assert_eq!(load.value[0].player, PLAYER_SCAVENGERS, "max_players = {}", max_players);
    }
}

#[test]
fn test_feature_visibility_and_player_ignored() {
    let bytes = Bytes::new()
        .tag(b"feat")
        .u32(14)
        .u32(1)
        .name("OilResource", SHORT_NAME_LENGTH)
        .u32(8)
        .u32(500)
        .u32(600)
        .u32(0)
        .u32(0)
        .u32(2)
        .i32(0)
        .u32(0)
        .u32(0)
        .raw(&[0, 0, 1, 0, 0, 0, 0, 0]);
    let io = MemoryIoProvider::new();
    io.insert("feat.bjo", bytes.build());
    let logger = RecordingLogger::new();

    let load = load_features("feat.bjo", 4, &io, &logger).loaded().unwrap();
    let feature = &load.value[0];
    assert_eq!(feature.player, None);
    assert_eq!(feature.position, WorldPos::new(500, 600));
    assert!(logger.contains(LogLevel::Warning, "player(2)"));
    assert!(logger.contains(LogLevel::Warning, "visibility[2]=1"));
    assert_eq!(logger.count(LogLevel::Warning), 2);
}

#[test]
fn test_names_stop_at_nul() {
    let bytes = droid_record(Bytes::new().tag(b"dint").u32(8).u32(1), "Truck", 1, 0);
    let io = MemoryIoProvider::new();
    io.insert("dinit.bjo", bytes.build());
    let logger = RecordingLogger::new();
    let load = load_droids("dinit.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(load.value[0].name, "Truck");
}

#[test]
fn test_write_objects_round_trip() {
    let structures = vec![
        Structure {
            id: Some(5),
            name: "A0PowerGen".to_string(),
            position: WorldPos::new(1088, 960),
            direction: direction_from_degrees(270),
            player: 1,
            modules: 0,
        },
        Structure {
            id: None,
            name: "A0CannonTower".to_string(),
            position: WorldPos::new(320, 448),
            direction: 0,
            player: PLAYER_SCAVENGERS,
            modules: 0,
        },
    ];
    let droids = vec![Droid {
        id: None,
        name: "ConstructorDroid".to_string(),
        position: WorldPos::new(64 + 128 * 3, 64 + 128 * 5),
        direction: direction_from_degrees(90),
        player: 0,
    }];
    let features = vec![Feature {
        id: Some(2),
        name: "Tree1".to_string(),
        position: WorldPos::new(700, 900),
        direction: 0,
        player: None,
    }];

    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert!(write_structures(&structures, 4, "struct.bjo", &io, DEFAULT_STRUCTURE_VERSION, &logger));
    assert!(write_droids(&droids, 4, "dinit.bjo", &io, DEFAULT_DROID_VERSION, &logger));
    assert!(write_features(&features, 4, "feat.bjo", &io, DEFAULT_FEATURE_VERSION, &logger));

    let read_structures = load_structures("struct.bjo", 4, &io, &logger).loaded().unwrap().value;
    assert_eq!(read_structures[0], structures[0]);
    assert_eq!(read_structures[1].id, Some(6));
    assert_eq!(read_structures[1].player, PLAYER_SCAVENGERS);

    let read_droids = load_droids("dinit.bjo", 4, &io, &logger).loaded().unwrap().value;
    assert_eq!(read_droids[0].id, Some(1));
    assert_eq!(read_droids[0].position, droids[0].position);
    assert_eq!(read_droids[0].direction, droids[0].direction);

    let read_features = load_features("feat.bjo", 4, &io, &logger).loaded().unwrap().value;
    assert_eq!(read_features, features);
    assert_eq!(logger.count(LogLevel::Warning), 0);
    assert_eq!(logger.count(LogLevel::Error), 0);
}

#[test]
fn test_write_structure_with_modules_warns() {
    let structures = vec![Structure {
        id: Some(1),
        name: "A0LightFactory".to_string(),
        player: 0,
        modules: 2,
        ..Default::default()
    }];
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert!(write_structures(&structures, 4, "struct.bjo", &io, 8, &logger));
    assert!(logger.contains(LogLevel::Warning, "modules (2)"));
}

#[test]
fn test_write_rejects_invalid_input() {
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    let structures = vec![Structure {
        name: "A0LightFactory".to_string(),
        player: -3,
        ..Default::default()
    }];
    assert!(!write_structures(&structures, 4, "struct.bjo", &io, 8, &logger));
    assert!(!write_structures(&[], 4, "struct.bjo", &io, 9, &logger));
    assert!(!write_droids(&[], 4, "dinit.bjo", &io, 40, &logger));
    assert!(!write_features(&[], 4, "feat.bjo", &io, 20, &logger));
    assert!(io.paths().is_empty());
    assert_eq!(logger.count(LogLevel::Error), 4);
}

#[test]
fn test_long_names_truncated() {
    let long_name = "X".repeat(SHORT_NAME_LENGTH + 5);
    let droids = vec![Droid {
        id: Some(1),
        name: long_name,
        ..Default::default()
    }];
    let io = MemoryIoProvider::new();
    let logger = RecordingLogger::new();
    assert!(write_droids(&droids, 4, "dinit.bjo", &io, 8, &logger));
    assert_eq!(logger.count(LogLevel::Warning), 1);
    let load = load_droids("dinit.bjo", 4, &io, &logger).loaded().unwrap();
    assert_eq!(load.value[0].name.len(), SHORT_NAME_LENGTH);
}

#[test]
fn test_direction_conversion() {
    for degrees in [0u32, 1, 45, 90, 179, 270, 359] {
        assert_eq!(direction_to_degrees(direction_from_degrees(degrees)), degrees);
    }
    assert_eq!(direction_from_degrees(360), 0);
}
