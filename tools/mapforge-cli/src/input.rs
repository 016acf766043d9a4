//! Opening a map from a folder or a zip archive.

use std::path::Path;

use anyhow::{Context, Result, bail};
use mapforge_core::io::{FsIoProvider, IoProvider, ZipIoProvider};
use mapforge_core::{Map, MapConfig, default_logger};

/// A map folder (resolved relative to the provider root) and the provider that reads it.
pub struct MapInput {
    pub io: Box<dyn IoProvider>,
    pub folder: String,
}

impl MapInput {
    /// Directories are read in place; files are treated as zip archives.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Self {
                io: Box::new(FsIoProvider::new(path)),
                folder: String::new(),
            });
        }
        if !path.is_file() {
            bail!("No such map folder or archive: {}", path.display());
        }

        let archive = ZipIoProvider::open(path)
            .with_context(|| format!("Failed to open map archive {}", path.display()))?;
        let folder = archive
            .find_map_folder()
            .with_context(|| format!("No game.map or game.wasm in {}", path.display()))?;
        Ok(Self {
            io: Box::new(archive),
            folder,
        })
    }
}

/// Open and load the map at `path` using `settings`.
pub fn load_map(path: &Path, settings: &MapConfig) -> Result<Map> {
    let input = MapInput::open(path)?;
    tracing::debug!(folder = %input.folder, "opening map");
    Map::load(&input.folder, settings.load_options(), default_logger(), input.io)
        .with_context(|| format!("Failed to load map from {}", path.display()))
}
