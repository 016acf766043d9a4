//! Entity codecs.
//!
//! Two families decode the same logical content:
//!
//! - [`binary`] - the legacy fixed-layout little-endian files (`game.map`, `*.bjo`, `ttypes.ttp`)
//! - [`json`] - the two JSON schema generations (`struct.json`, `droid.json`, `feature.json`)
//!
//! Every decoder returns a [`Decoded`] so the map resolver can tell "the file is not there"
//! apart from "the file is there but unusable" without matching on errors.

pub mod binary;
pub mod json;

use std::fmt;

use crate::logging::{LogLevel, MapLogger};

/// Terrain grid and gateways.
pub const MAP_DATA_FILE: &str = "game.map";
/// Terrain type table.
pub const TERRAIN_TYPES_FILE: &str = "ttypes.ttp";
pub const STRUCTURES_JSON_FILE: &str = "struct.json";
pub const STRUCTURES_BINARY_FILE: &str = "struct.bjo";
pub const DROIDS_JSON_FILE: &str = "droid.json";
pub const DROIDS_BINARY_FILE: &str = "dinit.bjo";
pub const FEATURES_JSON_FILE: &str = "feature.json";
pub const FEATURES_BINARY_FILE: &str = "feat.bjo";
/// Map generation script.
pub const MAP_SCRIPT_FILE: &str = "game.wasm";

/// A successfully decoded file and the format version it declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLoad<T> {
    pub value: T,
    pub version: u32,
}

impl<T> FileLoad<T> {
    pub fn new(value: T, version: u32) -> Self {
        Self { value, version }
    }
}

/// Outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Loaded(FileLoad<T>),
    /// The resource could not be opened.
    Absent,
    /// The resource exists but was rejected. The reason has already been logged.
    Malformed,
}

impl<T> Decoded<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn loaded(self) -> Option<FileLoad<T>> {
        match self {
            Self::Loaded(load) => Some(load),
            Self::Absent | Self::Malformed => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        match self {
            Self::Loaded(FileLoad { value, version }) => Decoded::Loaded(FileLoad::new(f(value), version)),
            Self::Absent => Decoded::Absent,
            Self::Malformed => Decoded::Malformed,
        }
    }
}

/// Reporter for read-but-ignored values within one file.
#[derive(Clone, Copy)]
pub(crate) struct Advisory<'a> {
    path: &'a str,
    logger: &'a dyn MapLogger,
}

impl<'a> Advisory<'a> {
    pub(crate) fn new(path: &'a str, logger: &'a dyn MapLogger) -> Self {
        Self { path, logger }
    }

    /// Warn that `field` carried a value that will not reach the entity model.
    pub(crate) fn ignoring(&self, field: &str, value: impl fmt::Display, kind: &str, index: u32) {
        self.warning(format_args!(
            "Ignoring {}({}) for {} {}",
            field, value, kind, index
        ));
    }

    pub(crate) fn warning(&self, message: fmt::Arguments<'_>) {
        self.logger
            .log(LogLevel::Warning, &format!("{}: {}", self.path, message));
    }
}
