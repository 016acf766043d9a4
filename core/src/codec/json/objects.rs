//! `struct.json`, `droid.json` and `feature.json`.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map as JsonObject, Value, json};

use super::{
    BaseInfo, MAX_JSON_VERSION, RecordContext, check_unknown_keys, json_integer, load_document,
    read_base_info, read_player, record_entries,
};
use crate::codec::{Decoded, FileLoad};
use crate::error::{JsonEncodeError, RecordError};
use crate::io::IoProvider;
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;
use mapforge_shared::{Droid, Feature, MapType, PLAYER_SCAVENGERS, Structure, WorldPos};

/// How one entity kind is laid out in JSON.
struct RecordKind {
    /// Singular noun for diagnostics and version 1 record keys.
    kind: &'static str,
    /// Version 2 array key.
    container: &'static str,
    name_key: &'static str,
    known_keys: &'static [&'static str],
}

const STRUCTURES: RecordKind = RecordKind {
    kind: "structure",
    container: "structures",
    name_key: "name",
    known_keys: &["name", "id", "position", "rotation", "player", "startpos", "modules"],
};

const DROIDS: RecordKind = RecordKind {
    kind: "droid",
    container: "droids",
    name_key: "template",
    known_keys: &["template", "id", "position", "rotation", "player", "startpos"],
};

const FEATURES: RecordKind = RecordKind {
    kind: "feature",
    container: "features",
    name_key: "name",
    known_keys: &["name", "id", "position", "rotation", "player"],
};

fn load_records<T>(
    path: &str,
    map_type: MapType,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
    layout: &RecordKind,
    parse: impl Fn(&JsonObject<String, Value>, BaseInfo, &RecordContext<'_>) -> Result<T, RecordError>,
) -> Decoded<Vec<T>> {
    let document = match load_document(path, io, logger) {
        Decoded::Loaded(document) => document,
        Decoded::Absent => return Decoded::Absent,
        Decoded::Malformed => return Decoded::Malformed,
    };
    let FileLoad { value: root, version } = document;

    let entries = match record_entries(&root, version, layout.container) {
        Ok(entries) => entries,
        Err(e) => {
            map_log!(logger, LogLevel::Error, "{}: {}", path, e);
            return Decoded::Malformed;
        }
    };

    let mut records = Vec::new();
    for (label, value) in entries {
        let Value::Object(obj) = value else {
            continue;
        };
        let ctx = RecordContext {
            path,
            record: &label,
            version,
            map_type,
            logger,
        };
        let parsed = read_base_info(obj, layout.name_key, &ctx).and_then(|base| parse(obj, base, &ctx));
        match parsed {
            Ok(record) => {
                check_unknown_keys(obj, layout.known_keys, layout.kind, &ctx);
                records.push(record);
            }
            Err(e) => ctx.log(LogLevel::Error, format_args!("{}", e)),
        }
    }

    Decoded::Loaded(FileLoad::new(records, version))
}

/// Decode `struct.json`.
pub fn load_structures(
    path: &str,
    map_type: MapType,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Structure>> {
    load_records(path, map_type, io, logger, &STRUCTURES, |obj, base, ctx| {
        let player = read_player(obj, false, ctx)?.ok_or(RecordError::MissingPlayer)?;
        let modules = match obj.get("modules") {
            None => 0,
            Some(value) => {
                let count = json_integer(value).ok_or(RecordError::WrongType {
                    key: "modules",
                    expected: "number",
                })?;
                u8::try_from(count).map_err(|_| RecordError::ModulesOutOfRange)?
            }
        };
        Ok(Structure {
            id: base.id,
            name: base.name,
            position: WorldPos::new(base.position.0, base.position.1),
            direction: base.direction,
            player,
            modules,
        })
    })
}

/// Decode `droid.json`.
pub fn load_droids(
    path: &str,
    map_type: MapType,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Droid>> {
    load_records(path, map_type, io, logger, &DROIDS, |obj, base, ctx| {
        let player = read_player(obj, false, ctx)?.ok_or(RecordError::MissingPlayer)?;
        Ok(Droid {
            id: base.id,
            name: base.name,
            position: WorldPos::new(base.position.0, base.position.1),
            direction: base.direction,
            player,
        })
    })
}

/// Decode `feature.json`. Owners are only honoured on campaign and savegame maps.
pub fn load_features(
    path: &str,
    map_type: MapType,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<Vec<Feature>> {
    load_records(path, map_type, io, logger, &FEATURES, |obj, base, ctx| {
        let player = match read_player(obj, true, ctx)? {
            Some(player) if !owners_allowed(ctx.map_type) => {
                ctx.log(
                    LogLevel::Warning,
                    format_args!("Ignoring assigned player ({})", player),
                );
                None
            }
            player => player,
        };
        Ok(Feature {
            id: base.id,
            name: base.name,
            position: WorldPos::new(base.position.0, base.position.1),
            direction: base.direction,
            player,
        })
    })
}

fn owners_allowed(map_type: MapType) -> bool {
    matches!(map_type, MapType::Campaign | MapType::Savegame)
}

// ============================================================================
// Encoding
// ============================================================================

/// `name`/`template`, optional `id`, `position` and `rotation` in canonical order.
fn base_object(
    name_key: &str,
    name: &str,
    id: Option<u32>,
    position: WorldPos,
    direction: u16,
    version: u32,
) -> JsonObject<String, Value> {
    let mut obj = JsonObject::new();
    obj.insert(name_key.to_string(), json!(name));
    if let Some(id) = id {
        obj.insert("id".to_string(), json!(id));
    }
    if version == 1 {
        obj.insert("position".to_string(), json!([position.x, position.y, 0]));
        obj.insert("rotation".to_string(), json!([direction]));
    } else {
        obj.insert("position".to_string(), json!([position.x, position.y]));
        obj.insert("rotation".to_string(), json!(direction));
    }
    obj
}

/// Scavengers are always `"player": "scavenger"`; other owners depend on the map type.
fn insert_player(
    obj: &mut JsonObject<String, Value>,
    map_type: MapType,
    player: i8,
) -> Result<(), JsonEncodeError> {
    if player == PLAYER_SCAVENGERS {
        obj.insert("player".to_string(), json!("scavenger"));
        return Ok(());
    }
    if player < 0 {
        return Err(JsonEncodeError::InvalidPlayer(player));
    }
    let key = if owners_allowed(map_type) {
        "player"
    } else {
        "startpos"
    };
    obj.insert(key.to_string(), json!(player));
    Ok(())
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Assemble the document for `records` and write it with a four-space indent.
fn write_records(
    records: Vec<JsonObject<String, Value>>,
    layout: &RecordKind,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
) -> Result<(), JsonEncodeError> {
    let mut root = JsonObject::new();
    if version == 1 {
        let width = digit_count(records.len());
        for (index, record) in records.into_iter().enumerate() {
            root.insert(
                format!("{}_{:0width$}", layout.kind, index, width = width),
                Value::Object(record),
            );
        }
    } else {
        root.insert("version".to_string(), json!(version));
        root.insert(
            layout.container.to_string(),
            Value::Array(records.into_iter().map(Value::Object).collect()),
        );
    }

    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    Value::Object(root)
        .serialize(&mut serializer)
        .map_err(|e| JsonEncodeError::Serialize(e.to_string()))?;

    if io.write_full_file(path, &out) {
        Ok(())
    } else {
        Err(JsonEncodeError::WriteFailed)
    }
}

fn encode_records<T>(
    objects: &[T],
    layout: &RecordKind,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
    encode: impl Fn(&T) -> Result<JsonObject<String, Value>, JsonEncodeError>,
) -> bool {
    let result = if version == 0 || version > MAX_JSON_VERSION {
        Err(JsonEncodeError::UnsupportedVersion(version))
    } else {
        objects
            .iter()
            .map(encode)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|records| {
                map_log!(logger, LogLevel::Info, "Writing: {}", path);
                write_records(records, layout, path, io, version)
            })
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            map_log!(logger, LogLevel::Error, "{}: {}", path, e);
            false
        }
    }
}

/// Encode `struct.json` at schema `version` (1 or 2).
pub fn write_structures(
    structures: &[Structure],
    map_type: MapType,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_records(structures, &STRUCTURES, path, io, version, logger, |s| {
        let mut obj = base_object("name", &s.name, s.id, s.position, s.direction, version);
        insert_player(&mut obj, map_type, s.player)?;
        if s.modules > 0 {
            obj.insert("modules".to_string(), json!(s.modules));
        }
        Ok(obj)
    })
}

/// Encode `droid.json` at schema `version` (1 or 2).
pub fn write_droids(
    droids: &[Droid],
    map_type: MapType,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_records(droids, &DROIDS, path, io, version, logger, |d| {
        let mut obj = base_object("template", &d.name, d.id, d.position, d.direction, version);
        insert_player(&mut obj, map_type, d.player)?;
        Ok(obj)
    })
}

/// Encode `feature.json` at schema `version` (1 or 2).
pub fn write_features(
    features: &[Feature],
    map_type: MapType,
    path: &str,
    io: &dyn IoProvider,
    version: u32,
    logger: &dyn MapLogger,
) -> bool {
    encode_records(features, &FEATURES, path, io, version, logger, |f| {
        let mut obj = base_object("name", &f.name, f.id, f.position, f.direction, version);
        if let Some(player) = f.player {
            if owners_allowed(map_type) {
                insert_player(&mut obj, map_type, player)?;
            } else {
                map_log!(
                    logger,
                    LogLevel::Warning,
                    "Ignoring assigned player ({}) for feature \"{}\"",
                    player,
                    f.name
                );
            }
        }
        Ok(obj)
    })
}
