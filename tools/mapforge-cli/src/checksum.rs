//! Checksum command - print the map checksum

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use mapforge_core::MapConfig;

use crate::input::load_map;

/// Arguments for the checksum command
#[derive(Args)]
pub struct ChecksumArgs {
    /// Map folder or .zip archive
    pub input: PathBuf,
}

pub fn execute(args: ChecksumArgs, settings: &MapConfig) -> Result<()> {
    let mut map = load_map(&args.input, settings)?;
    println!("{:016x}", map.checksum());
    Ok(())
}
