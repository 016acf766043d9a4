//! Mapforge CLI - inspect and convert map folders
//!
//! # Commands
//!
//! - `mapforge info` - Print dimensions, object counts, loaded format and checksum
//! - `mapforge convert` - Re-export a map in another on-disk generation
//! - `mapforge checksum` - Print the map checksum
//!
//! # Usage
//!
//! ```bash
//! # Inspect a map folder or a map archive
//! mapforge info multiplay/maps/4c-rush
//! mapforge info 4c-rush.zip
//!
//! # Convert a legacy binary map to JSON
//! mapforge convert old-map/ new-map/ --format json-v2
//!
//! # Generate a script map with a seed and print its checksum
//! mapforge --seed 42 checksum generated-map/
//! ```
//!
//! Defaults come from `config.toml` in the platform config directory (or `--config`);
//! command line options override them.

mod checksum;
mod convert;
mod info;
mod input;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mapforge_core::config::{self, MapConfig};
use mapforge_shared::{MapType, OutputFormat};

/// Mapforge CLI - inspect and convert map folders
#[derive(Parser)]
#[command(name = "mapforge")]
#[command(about = "Inspect and convert grid RTS map folders")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Configuration file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Kind of game the map is loaded for
    #[arg(long, global = true, value_enum)]
    pub map_type: Option<MapTypeArg>,

    /// Number of player slots on the map
    #[arg(long, global = true)]
    pub players: Option<u32>,

    /// Seed for script-generated maps
    #[arg(long, global = true)]
    pub seed: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dimensions, object counts, loaded format and checksum
    Info(info::InfoArgs),

    /// Export a map in another on-disk generation
    Convert(convert::ConvertArgs),

    /// Print the 64-bit map checksum in hex
    Checksum(checksum::ChecksumArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MapTypeArg {
    Campaign,
    Savegame,
    Skirmish,
}

impl From<MapTypeArg> for MapType {
    fn from(arg: MapTypeArg) -> Self {
        match arg {
            MapTypeArg::Campaign => MapType::Campaign,
            MapTypeArg::Savegame => MapType::Savegame,
            MapTypeArg::Skirmish => MapType::Skirmish,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    BinaryOld,
    JsonV1,
    JsonV2,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::BinaryOld => OutputFormat::BinaryOld,
            FormatArg::JsonV1 => OutputFormat::JsonV1,
            FormatArg::JsonV2 => OutputFormat::JsonV2,
        }
    }
}

impl GlobalArgs {
    /// Configuration file merged with command line overrides.
    pub fn settings(&self) -> Result<MapConfig> {
        let mut settings = match &self.config {
            Some(path) => config::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => config::load(),
        };
        if let Some(map_type) = self.map_type {
            settings.map_type = map_type.into();
        }
        if let Some(players) = self.players {
            settings.max_players = players;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.global.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let settings = cli.global.settings()?;

    match cli.command {
        Commands::Info(args) => info::execute(args, &settings),
        Commands::Convert(args) => convert::execute(args, &settings),
        Commands::Checksum(args) => checksum::execute(args, &settings),
    }
}
