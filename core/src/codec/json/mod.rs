//! JSON codec.
//!
//! Version 1 documents are a root object whose every member is a record. Version 2 documents
//! carry `"version": 2` and keep the records in an array under a kind-specific key. Records
//! degrade gracefully: a bad record is reported and skipped, the rest of the file still loads.

mod objects;


pub use objects::{
    load_droids, load_features, load_structures, write_droids, write_features,
    write_structures,
};

use serde_json::{Map as JsonObject, Value};

use crate::codec::Decoded;
use crate::codec::FileLoad;
use crate::error::{JsonDocumentError, RecordError};
use crate::io::IoProvider;
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;
use mapforge_shared::{MapType, PLAYER_SCAVENGERS, is_valid_player};

/// Newest JSON schema generation.
pub const MAX_JSON_VERSION: u32 = 2;

/// Read `path` and check that it is a JSON object. The document version is returned with it.
pub(crate) fn load_document(
    path: &str,
    io: &dyn IoProvider,
    logger: &dyn MapLogger,
) -> Decoded<JsonObject<String, Value>> {
    let Some(data) = io.load_full_file(path) else {
        return Decoded::Absent;
    };

    match parse_document(&data) {
        Ok(load) => {
            map_log!(logger, LogLevel::Info, "Loading: {}", path);
            Decoded::Loaded(load)
        }
        Err(e) => {
            map_log!(logger, LogLevel::Error, "{}: {}", path, e);
            Decoded::Malformed
        }
    }
}

fn parse_document(data: &[u8]) -> Result<FileLoad<JsonObject<String, Value>>, JsonDocumentError> {
    if data.is_empty() {
        return Err(JsonDocumentError::Empty);
    }
    let root: Value =
        serde_json::from_slice(data).map_err(|e| JsonDocumentError::Parse(e.to_string()))?;
    let Value::Object(root) = root else {
        return Err(JsonDocumentError::NotObject);
    };
    let version = document_version(&root)?;
    Ok(FileLoad::new(root, version))
}

/// Version 1 has no `version` key; an explicit one must be a supported later generation.
fn document_version(root: &JsonObject<String, Value>) -> Result<u32, JsonDocumentError> {
    let Some(value) = root.get("version") else {
        return Ok(1);
    };
    let version = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .unwrap_or(0),
        _ => return Err(JsonDocumentError::VersionNotNumber),
    };
    match version {
        1 => Err(JsonDocumentError::ExplicitVersionOne(version)),
        0 => Err(JsonDocumentError::UnsupportedVersion(version)),
        v if v > u64::from(MAX_JSON_VERSION) => Err(JsonDocumentError::UnsupportedVersion(v)),
        v => Ok(v as u32),
    }
}

/// The records of a document, each labelled for diagnostics.
pub(crate) fn record_entries<'a>(
    root: &'a JsonObject<String, Value>,
    version: u32,
    container: &'static str,
) -> Result<Vec<(String, &'a Value)>, JsonDocumentError> {
    if version == 1 {
        return Ok(root.iter().map(|(k, v)| (k.clone(), v)).collect());
    }
    let items = root
        .get(container)
        .ok_or(JsonDocumentError::MissingContainer(container))?
        .as_array()
        .ok_or(JsonDocumentError::ContainerNotArray(container))?;
    Ok(items
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("{}[{}]", container, i), v))
        .collect())
}

/// Where a record came from, for diagnostics.
pub(crate) struct RecordContext<'a> {
    pub path: &'a str,
    pub record: &'a str,
    pub version: u32,
    pub map_type: MapType,
    pub logger: &'a dyn MapLogger,
}

impl RecordContext<'_> {
    pub(crate) fn log(&self, level: LogLevel, message: std::fmt::Arguments<'_>) {
        self.logger
            .log(level, &format!("{}: {} for: {}", self.path, message, self.record));
    }
}

/// Numeric types accepted inside `position` and `rotation`.
pub(crate) trait JsonComponent: Copy + Default + PartialEq {
    fn from_json(value: &Value) -> Option<Self>;
}

fn json_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
        .or_else(|| value.as_f64().map(|f| f as i64))
}

impl JsonComponent for i32 {
    fn from_json(value: &Value) -> Option<Self> {
        json_integer(value).and_then(|v| i32::try_from(v).ok())
    }
}

impl JsonComponent for u16 {
    fn from_json(value: &Value) -> Option<Self> {
        json_integer(value).and_then(|v| u16::try_from(v).ok())
    }
}

/// Read between `min` and `max` components from `key`.
///
/// Returns `Ok(None)` when the key is absent. Components past `max` are reported but do not
/// reject the record; non-zero components between `min` and `max` are ignored with a note.
pub(crate) fn read_components<T: JsonComponent>(
    obj: &JsonObject<String, Value>,
    key: &'static str,
    min: usize,
    max: usize,
    allow_scalar: bool,
    ctx: &RecordContext<'_>,
) -> Result<Option<Vec<T>>, RecordError> {
    let Some(value) = obj.get(key) else {
        return Ok(None);
    };

    let items = match value {
        Value::Array(items) => items,
        scalar if allow_scalar && min <= 1 => {
            let v = T::from_json(scalar).ok_or(RecordError::BadComponent(key))?;
            return Ok(Some(vec![v]));
        }
        _ if min > 1 => return Err(RecordError::TooFewComponents { key, min }),
        _ => return Err(RecordError::NotAnArray(key)),
    };

    if items.len() < min {
        return Err(RecordError::TooFewComponents { key, min });
    }
    let values = items[..min]
        .iter()
        .map(T::from_json)
        .collect::<Option<Vec<_>>>()
        .ok_or(RecordError::BadComponent(key))?;

    if items.len() > max {
        ctx.log(
            LogLevel::Error,
            format_args!("Invalid \"{}\" (too many array members)", key),
        );
    } else {
        for (idx, extra) in items.iter().enumerate().skip(min) {
            match T::from_json(extra) {
                Some(v) if v != T::default() => ctx.log(
                    LogLevel::InfoVerbose,
                    format_args!("Ignoring non-0 \"{}[{}]\"", key, idx),
                ),
                Some(_) => {}
                None => ctx.log(
                    LogLevel::Warning,
                    format_args!("Invalid ignored \"{}\" member", key),
                ),
            }
        }
    }
    Ok(Some(values))
}

/// Fields shared by every record kind.
pub(crate) struct BaseInfo {
    pub id: Option<u32>,
    pub name: String,
    pub position: (i32, i32),
    pub direction: u16,
}

/// Read name, id, position and rotation.
pub(crate) fn read_base_info(
    obj: &JsonObject<String, Value>,
    name_key: &'static str,
    ctx: &RecordContext<'_>,
) -> Result<BaseInfo, RecordError> {
    let (max_position, max_rotation, rotation_scalar) = if ctx.version > 1 {
        (2, 1, true)
    } else {
        (3, 3, false)
    };

    let name = obj
        .get(name_key)
        .ok_or(RecordError::MissingKey(name_key))?
        .as_str()
        .ok_or(RecordError::WrongType {
            key: name_key,
            expected: "string",
        })?
        .to_string();

    let id = match obj.get("id") {
        None => None,
        Some(value) => {
            let id = value
                .as_u64()
                .or_else(|| value.as_f64().map(|f| f as u64))
                .ok_or(RecordError::WrongType {
                    key: "id",
                    expected: "number",
                })?;
            let id = u32::try_from(id).map_err(|_| RecordError::WrongType {
                key: "id",
                expected: "32-bit number",
            })?;
            if id == 0 {
                return Err(RecordError::ZeroId);
            }
            Some(id)
        }
    };

    let position = read_components::<i32>(obj, "position", 2, max_position, false, ctx)?
        .ok_or(RecordError::MissingKey("position"))?;
    // A bad rotation keeps the record facing 0.
    let direction = match read_components::<u16>(obj, "rotation", 1, max_rotation, rotation_scalar, ctx) {
        Ok(rotation) => rotation.map(|r| r[0]).unwrap_or(0),
        Err(e) => {
            ctx.log(LogLevel::Error, format_args!("{}", e));
            0
        }
    };

    Ok(BaseInfo {
        id,
        name,
        position: (position[0], position[1]),
        direction,
    })
}

/// Resolve a record's owner from `player` (preferred) or `startpos`.
///
/// `Ok(None)` means neither key is present. With `player_only`, `startpos` is not consulted.
pub(crate) fn read_player(
    obj: &JsonObject<String, Value>,
    player_only: bool,
    ctx: &RecordContext<'_>,
) -> Result<Option<i8>, RecordError> {
    if let Some(value) = obj.get("player") {
        if !player_only && obj.contains_key("startpos") {
            ctx.log(
                LogLevel::SyntaxWarning,
                format_args!("Processing \"player\", ignoring \"startpos\""),
            );
        }
        if let Some(s) = value.as_str()
            && s.starts_with("scavenger")
        {
            return Ok(Some(PLAYER_SCAVENGERS));
        }
        if value.is_number() {
            if !matches!(ctx.map_type, MapType::Campaign | MapType::Savegame) {
                ctx.log(
                    LogLevel::InfoVerbose,
                    format_args!("Found \"player\" for non-campaign/savegame"),
                );
            }
            return player_number(value).map(Some);
        }
        return Err(RecordError::InvalidPlayer);
    }

    if player_only {
        return Ok(None);
    }
    match obj.get("startpos") {
        Some(value) if value.is_number() => player_number(value).map(Some),
        Some(_) => Err(RecordError::InvalidPlayer),
        None => Ok(None),
    }
}

fn player_number(value: &Value) -> Result<i8, RecordError> {
    json_integer(value)
        .and_then(|v| i8::try_from(v).ok())
        .filter(|&p| is_valid_player(p))
        .ok_or(RecordError::InvalidPlayer)
}

/// Report members outside `known`.
pub(crate) fn check_unknown_keys(
    obj: &JsonObject<String, Value>,
    known: &[&str],
    kind: &str,
    ctx: &RecordContext<'_>,
) {
    for key in obj.keys().filter(|k| !known.contains(&k.as_str())) {
        ctx.log(
            LogLevel::SyntaxWarning,
            format_args!("Unexpected {} key \"{}\"", kind, key),
        );
    }
}
