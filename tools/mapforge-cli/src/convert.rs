//! Convert command - re-export a map in another on-disk generation

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use mapforge_core::MapConfig;
use mapforge_core::io::FsIoProvider;
use mapforge_shared::OutputFormat;

use crate::FormatArg;
use crate::input::load_map;

/// Arguments for the convert command
#[derive(Args)]
pub struct ConvertArgs {
    /// Map folder or .zip archive to read
    pub input: PathBuf,

    /// Folder to write the converted map into (created if missing)
    pub output: PathBuf,

    /// Generation to write (defaults to the configured output format)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Execute the convert command
pub fn execute(args: ConvertArgs, settings: &MapConfig) -> Result<()> {
    let format: OutputFormat = args
        .format
        .map(OutputFormat::from)
        .unwrap_or(settings.output_format);

    let mut map = load_map(&args.input, settings)?;
    let output = FsIoProvider::new(&args.output);
    let logger = map.logger().clone();
    if !map.export_to_path(
        "",
        settings.map_type,
        settings.max_players,
        format,
        &*logger,
        &output,
    ) {
        bail!(
            "Failed to convert {} into {}",
            args.input.display(),
            args.output.display()
        );
    }

    println!("Converted {} -> {} ({:?})", args.input.display(), args.output.display(), format);
    println!("  Checksum: {:016x}", map.checksum());
    Ok(())
}
