//! Mapforge Core - map load/save for grid RTS maps
//!
//! This crate reads and writes the on-disk map generations (legacy binary, JSON v1 and v2),
//! resolves which generation a map folder uses, and runs script-generated maps inside a
//! sandbox.
//!
//! # Architecture
//!
//! - [`io`] - Byte-Stream Provider over folders, zip archives and memory
//! - [`codec`] - Binary and JSON entity codecs
//! - [`Map`] - Format resolver with lazy, memoized part loading and export
//! - [`MapScriptRunner`] - WebAssembly map script sandbox
//! - [`MapChecksum`] - Order-sensitive checksum for map agreement

pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod map;
pub mod script;
#[cfg(test)]
pub mod test_utils;

pub use mapforge_shared as shared;

// Re-export map façade types
pub use map::{
    FileType, LoadedFileVersion, LoadedFormat, Map, MapContents, MapFile, MapLoadOptions,
    MapParts,
};

// Re-export script sandbox types
pub use script::{DeadlineCheck, InterruptCheck, MapScriptRunner, ScriptLimits, ScriptOutput};

// Re-export logging and errors
pub use checksum::MapChecksum;
pub use config::MapConfig;
pub use error::{ConfigError, ScriptError};
pub use logging::{LogLevel, MapLogger, SharedLogger, TracingLogger, default_logger};
