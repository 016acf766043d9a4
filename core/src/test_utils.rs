//! Shared test utilities for unit tests

use std::sync::{Arc, Mutex};

use crate::logging::{LogLevel, MapLogger};

// ============================================================================
// Recording logger
// ============================================================================

/// Captures every diagnostic so tests can count and inspect them.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// True if any message at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl MapLogger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

// ============================================================================
// Byte builders
// ============================================================================

/// Little-endian byte buffer builder for hand-crafted binary fixtures.
#[derive(Debug, Default, Clone)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: &[u8; 4]) -> Self {
        self.0.extend_from_slice(tag);
        self
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// NUL-padded fixed-size name.
    pub fn name(mut self, name: &str, len: usize) -> Self {
        let mut buf = vec![0u8; len];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        self.0.extend_from_slice(&buf);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}
