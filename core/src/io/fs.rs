//! Filesystem-backed provider.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use mapforge_shared::ids::is_safe_relative_path;

use super::{IoProvider, MapStream, ReadStream, WriteStream};

/// Resolves resource paths below a root directory.
///
/// Paths are `/`-separated and relative; anything that would escape the root is refused.
#[derive(Debug, Clone)]
pub struct FsIoProvider {
    root: PathBuf,
}

impl FsIoProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        if path.is_empty() {
            return Some(self.root.clone());
        }
        if !is_safe_relative_path(path) {
            tracing::warn!("refusing unsafe resource path: {:?}", path);
            return None;
        }
        Some(path.split('/').fold(self.root.clone(), |acc, part| acc.join(part)))
    }
}

impl IoProvider for FsIoProvider {
    fn open_for_read(&self, path: &str) -> Option<Box<dyn MapStream>> {
        let file = File::open(self.resolve(path)?).ok()?;
        Some(Box::new(ReadStream::new(BufReader::new(file))))
    }

    fn open_for_write(&self, path: &str) -> Option<Box<dyn MapStream>> {
        let file = File::create(self.resolve(path)?).ok()?;
        Some(Box::new(WriteStream::new(BufWriter::new(file))))
    }

    fn make_directory(&self, path: &str) -> bool {
        match self.resolve(path) {
            Some(dir) => std::fs::create_dir_all(dir).is_ok(),
            None => false,
        }
    }
}
