//! Info command - summarize a map

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mapforge_core::{MapConfig, MapFile};

use crate::input::load_map;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Map folder or .zip archive
    pub input: PathBuf,
}

/// Execute the info command
pub fn execute(args: InfoArgs, settings: &MapConfig) -> Result<()> {
    let mut map = load_map(&args.input, settings)?;
    let contents = map
        .contents()
        .with_context(|| format!("Map in {} is incomplete", args.input.display()))?;

    println!("=== Map Info ===");
    println!("  Source: {}", args.input.display());
    println!(
        "  Size: {} x {} ({} tiles)",
        contents.map_data.width,
        contents.map_data.height,
        contents.map_data.tiles.len()
    );
    println!("  Gateways: {}", contents.map_data.gateways.len());
    println!("  Terrain types: {}", contents.terrain_types.len());
    println!("  Structures: {}", contents.structures.len());
    println!("  Droids: {}", contents.droids.len());
    println!("  Features: {}", contents.features.len());

    if let Some(format) = map.loaded_map_format() {
        println!("  Format: {:?}", format);
    }
    for file in [
        MapFile::MapData,
        MapFile::TerrainTypes,
        MapFile::Structures,
        MapFile::Droids,
        MapFile::Features,
    ] {
        if let Some(version) = map.file_version(file) {
            println!("    {:?}: {:?} v{}", file, version.file_type, version.version);
        }
    }
    println!("  Checksum: {:016x}", map.checksum());

    Ok(())
}
