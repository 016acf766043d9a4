//! Error taxonomy for the map core.
//!
//! These errors stay inside the crate's codecs: public entry points log them once through
//! the caller's [`crate::logging::MapLogger`] and return an absent result.

/// Fatal problems while decoding a binary resource. The whole file is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryDecodeError {
    #[error("bad header")]
    BadHeader,
    #[error("unsupported {kind} file version: {version}")]
    UnsupportedVersion { kind: &'static str, version: u32 },
    #[error("undefined {kind} file version: {version}")]
    UndefinedVersion { kind: &'static str, version: u32 },
    #[error("map too large: {width} x {height}")]
    MapTooLarge { width: u32, height: u32 },
    #[error("map is too small: {width} x {height}")]
    MapTooSmall { width: u32, height: u32 },
    #[error("failed to read map tile {0}")]
    TruncatedTile(u32),
    #[error("bad gateway header")]
    BadGatewayHeader,
    #[error("failed to read gateway {0}")]
    TruncatedGateway(u32),
    #[error("failed to read {kind} {index}")]
    TruncatedRecord { kind: &'static str, index: u32 },
    #[error("terrain type {value} out of range at entry {index}")]
    TerrainTypeOutOfRange { index: usize, value: u16 },
}

/// Problems while encoding a binary resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryEncodeError {
    #[error("failed to open for writing")]
    OpenFailed,
    #[error("unsupported {kind} file version: {version}")]
    UnsupportedVersion { kind: &'static str, version: u32 },
    #[error("map dimensions out of range: {width} x {height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("map width x height ({width} x {height}) != number of map tiles ({tiles})")]
    TileCountMismatch { width: u32, height: u32, tiles: usize },
    #[error("tile height ({height}) exceeds maximum supported by output format ({max})")]
    TileTooHigh { height: u16, max: u16 },
    #[error("invalid player number ({0})")]
    InvalidPlayer(i8),
    #[error("too many {kind} records ({count})")]
    TooManyRecords { kind: &'static str, count: usize },
    #[error("write failed")]
    WriteFailed,
}

/// Problems with a JSON document as a whole. The codec reports the file as unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonDocumentError {
    #[error("empty file")]
    Empty,
    #[error("JSON document is invalid: {0}")]
    Parse(String),
    #[error("JSON document is not an object")]
    NotObject,
    #[error("\"version\" key is not a number")]
    VersionNotNumber,
    #[error("unsupported file \"version\" ({0}) - version 1 lacks a \"version\" key")]
    ExplicitVersionOne(u64),
    #[error("unsupported file \"version\" ({0})")]
    UnsupportedVersion(u64),
    #[error("missing required \"{0}\" key in root object")]
    MissingContainer(&'static str),
    #[error("\"{0}\" value should be an array")]
    ContainerNotArray(&'static str),
}

/// A single JSON record that cannot be used. Only that record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing required \"{0}\" key")]
    MissingKey(&'static str),
    #[error("unexpected type of \"{key}\" key (expecting {expected})")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
    #[error("invalid \"id\" = 0")]
    ZeroId,
    #[error("invalid \"{key}\" (requires at least {min} members)")]
    TooFewComponents { key: &'static str, min: usize },
    #[error("invalid \"{0}\" (expecting an array)")]
    NotAnArray(&'static str),
    #[error("invalid \"{0}\" (unable to convert to desired output type)")]
    BadComponent(&'static str),
    #[error("missing required player/startpos key")]
    MissingPlayer,
    #[error("invalid player value")]
    InvalidPlayer,
    #[error("\"modules\" value is negative or exceeds maximum allowable value")]
    ModulesOutOfRange,
}

/// Problems while encoding a JSON resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonEncodeError {
    #[error("unsupported JSON file version: {0}")]
    UnsupportedVersion(u32),
    #[error("invalid player number ({0})")]
    InvalidPlayer(i8),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("write failed")]
    WriteFailed,
}

/// Reasons a map script run produced no map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to create script engine: {0}")]
    Engine(String),
    #[error("syntax / compilation error: {0}")]
    Compile(String),
    #[error("failed to instantiate script: {0}")]
    Instantiate(String),
    #[error("uncaught exception: {0}")]
    Trap(String),
    #[error("script exceeded the maximum runtime ({0} seconds)")]
    TimedOut(u64),
    #[error("script exceeded the memory limit ({0} bytes)")]
    MemoryLimit(usize),
    #[error("script finished without calling set_map_data")]
    NoMapData,
    #[error("script runner was already used")]
    AlreadyRun,
    #[error("{function}: no exported memory")]
    NoMemory { function: &'static str },
    #[error("{function}: memory access ({len} bytes at {ptr}) exceeds bounds ({size})")]
    OutOfBounds {
        function: &'static str,
        ptr: u32,
        len: u64,
        size: usize,
    },
    #[error("{function}: {reason}")]
    BadArgument { function: &'static str, reason: String },
    #[error("set_map_data: map data already set")]
    AlreadyCommitted,
    #[error("set_map_data: invalid map dimensions {width} x {height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("set_map_data: {array} array length ({len}) != width * height ({expected})")]
    ArrayLength {
        array: &'static str,
        len: u32,
        expected: u32,
    },
    #[error("set_map_data: texture[{index}] ({value}) exceeds maximum allowable value")]
    TextureOutOfRange { index: u32, value: u32 },
    #[error("set_map_data: height[{index}] ({value}) exceeds maximum allowable value")]
    HeightOutOfRange { index: u32, value: u32 },
    #[error("set_map_data: too many {kind} ({count})")]
    TooManyObjects { kind: &'static str, count: u32 },
    #[error("set_map_data: {kind}[{index}] {reason}")]
    InvalidObject {
        kind: &'static str,
        index: u32,
        reason: String,
    },
    #[error("generate_fractal_value_noise: rigged region callback \"{name}\" {reason}")]
    RiggedCallback { name: String, reason: String },
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
