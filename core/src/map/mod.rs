//! Format Resolver (Map façade)
//!
//! A [`Map`] hides which on-disk generation produced its content. Each entity kind is resolved
//! on first access through an explicit attempt order (JSON first, then legacy binary) and the
//! outcome is memoized, including failure. A folder containing `game.wasm` is instead run
//! through the script sandbox, which produces every kind at once.

mod export;
mod resolver;


pub use resolver::{FileType, LoadedFileVersion, LoadedFormat, MapFile};

use hashbrown::HashMap;
use tracing::debug;

use crate::checksum::MapChecksum;
use crate::codec::MAP_SCRIPT_FILE;
use crate::io::IoProvider;
use crate::logging::{LogLevel, SharedLogger};
use crate::map_log;
use crate::script::{InterruptCheck, MapScriptRunner, ScriptLimits, ScriptOutput};
use mapforge_shared::{Droid, Feature, MapData, MapType, Structure, TerrainTypeTable};
use resolver::{LoadContext, Memo};

/// Parameters for [`Map::load`].
pub struct MapLoadOptions {
    pub map_type: MapType,
    pub max_players: u32,
    /// Seed for script-generated maps. Ignored for stored maps.
    pub seed: u32,
    /// Exposed to scripts so they can skip work a preview does not need.
    pub preview: bool,
    pub script_limits: ScriptLimits,
    /// Replaces the wall-clock deadline check for script-generated maps.
    pub interrupt: Option<Box<dyn InterruptCheck>>,
}

impl MapLoadOptions {
    pub fn new(map_type: MapType, max_players: u32) -> Self {
        Self {
            map_type,
            max_players,
            seed: 0,
            preview: false,
            script_limits: ScriptLimits::default(),
            interrupt: None,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_script_limits(mut self, limits: ScriptLimits) -> Self {
        self.script_limits = limits;
        self
    }

    pub fn with_interrupt(mut self, check: impl InterruptCheck + 'static) -> Self {
        self.interrupt = Some(Box::new(check));
        self
    }
}

/// Fully built map content for [`Map::from_parts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapParts {
    pub map_data: MapData,
    pub terrain_types: Option<TerrainTypeTable>,
    pub structures: Vec<Structure>,
    pub droids: Vec<Droid>,
    pub features: Vec<Feature>,
}

/// Borrowed view of a fully resolved map.
#[derive(Debug, Clone, Copy)]
pub struct MapContents<'a> {
    pub map_data: &'a MapData,
    pub terrain_types: &'a TerrainTypeTable,
    pub structures: &'a [Structure],
    pub droids: &'a [Droid],
    pub features: &'a [Feature],
}

/// Where a lazy map reads from.
struct MapSource {
    folder: String,
    map_type: MapType,
    max_players: u32,
    io: Option<Box<dyn IoProvider>>,
    logger: SharedLogger,
}

impl MapSource {
    fn resolve<T>(
        &self,
        attempts: &[resolver::CodecAttempt<T>],
        file: MapFile,
        versions: &mut HashMap<MapFile, LoadedFileVersion>,
    ) -> Option<T> {
        let io = self.io.as_deref()?;
        let cx = LoadContext {
            map_type: self.map_type,
            max_players: self.max_players,
            io,
            logger: &*self.logger,
        };
        resolver::resolve(attempts, &self.folder, &cx, file, versions)
    }
}

/// A map whose parts are resolved on demand.
///
/// Not safe for concurrent use while parts are still pending; once [`Map::contents`] has
/// succeeded everything is resolved and the map no longer touches storage.
pub struct Map {
    source: MapSource,
    map_data: Memo<MapData>,
    terrain_types: Memo<TerrainTypeTable>,
    structures: Memo<Vec<Structure>>,
    droids: Memo<Vec<Droid>>,
    features: Memo<Vec<Feature>>,
    file_versions: HashMap<MapFile, LoadedFileVersion>,
    script_generated: bool,
}

impl Map {
    /// Open the map in `folder`.
    ///
    /// If the folder holds `game.wasm` the script runs now and the returned map is complete,
    /// or `None` if the script faulted or never committed map data. Otherwise a lazy map is
    /// returned and nothing is read until a part is requested.
    pub fn load_from_path(
        folder: &str,
        map_type: MapType,
        max_players: u32,
        seed: u32,
        preview: bool,
        logger: SharedLogger,
        io: Box<dyn IoProvider>,
    ) -> Option<Self> {
        let options = MapLoadOptions::new(map_type, max_players)
            .with_seed(seed)
            .with_preview(preview);
        Self::load(folder, options, logger, io)
    }

    /// [`Map::load_from_path`] with full control over script execution.
    pub fn load(
        folder: &str,
        options: MapLoadOptions,
        logger: SharedLogger,
        io: Box<dyn IoProvider>,
    ) -> Option<Self> {
        let script_path = io.path_join(folder, MAP_SCRIPT_FILE);
        let source = MapSource {
            folder: folder.to_string(),
            map_type: options.map_type,
            max_players: options.max_players,
            io: None,
            logger: logger.clone(),
        };

        let Some(script) = io.load_full_file(&script_path) else {
            debug!(folder, "no map script; resolving parts lazily");
            return Some(Self::lazy(MapSource {
                io: Some(io),
                ..source
            }));
        };

        map_log!(logger, LogLevel::Info, "Loading: {}", script_path);
        let mut runner = MapScriptRunner::new(
            options.seed,
            options.preview,
            options.script_limits,
            logger.clone(),
        );
        if let Some(check) = options.interrupt {
            runner = runner.with_boxed_interrupt(check);
        }

        match runner.run(&script, &script_path) {
            Ok(output) => Some(Self::from_script_output(
                output,
                MapSource {
                    io: Some(io),
                    ..source
                },
            )),
            Err(e) => {
                map_log!(logger, LogLevel::Error, "{}: {}", script_path, e);
                None
            }
        }
    }

    /// Build a map from content already in memory. Nothing is ever read from storage.
    pub fn from_parts(parts: MapParts, map_type: MapType, max_players: u32, logger: SharedLogger) -> Self {
        let mut map = Self::lazy(MapSource {
            folder: String::new(),
            map_type,
            max_players,
            io: None,
            logger,
        });
        map.map_data = Memo::ready(parts.map_data);
        map.terrain_types = Memo::Resolved(parts.terrain_types);
        map.structures = Memo::ready(parts.structures);
        map.droids = Memo::ready(parts.droids);
        map.features = Memo::ready(parts.features);
        map
    }

    fn lazy(source: MapSource) -> Self {
        Self {
            source,
            map_data: Memo::Pending,
            terrain_types: Memo::Pending,
            structures: Memo::Pending,
            droids: Memo::Pending,
            features: Memo::Pending,
            file_versions: HashMap::new(),
            script_generated: false,
        }
    }

    /// Script maps still read their terrain type table from the folder.
    fn from_script_output(output: ScriptOutput, source: MapSource) -> Self {
        let mut map = Self::lazy(source);
        map.map_data = Memo::ready(output.map_data);
        map.structures = Memo::ready(output.structures);
        map.droids = Memo::ready(output.droids);
        map.features = Memo::ready(output.features);
        let generated = LoadedFileVersion::new(FileType::ScriptGenerated, 0);
        for file in [MapFile::MapData, MapFile::Structures, MapFile::Droids, MapFile::Features] {
            map.file_versions.insert(file, generated);
        }
        map.script_generated = true;
        map
    }

    pub fn folder(&self) -> &str {
        &self.source.folder
    }

    pub fn map_type(&self) -> MapType {
        self.source.map_type
    }

    pub fn max_players(&self) -> u32 {
        self.source.max_players
    }

    pub fn was_script_generated(&self) -> bool {
        self.script_generated
    }

    pub fn logger(&self) -> &SharedLogger {
        &self.source.logger
    }

    pub fn map_data(&mut self) -> Option<&MapData> {
        let Self {
            source,
            map_data,
            file_versions,
            ..
        } = self;
        map_data.get_or_resolve(|| {
            source.resolve(resolver::MAP_DATA_ATTEMPTS, MapFile::MapData, file_versions)
        })
    }

    pub fn terrain_types(&mut self) -> Option<&TerrainTypeTable> {
        let Self {
            source,
            terrain_types,
            file_versions,
            ..
        } = self;
        terrain_types.get_or_resolve(|| {
            source.resolve(resolver::TERRAIN_TYPE_ATTEMPTS, MapFile::TerrainTypes, file_versions)
        })
    }

    pub fn structures(&mut self) -> Option<&[Structure]> {
        let Self {
            source,
            structures,
            file_versions,
            ..
        } = self;
        structures
            .get_or_resolve(|| {
                source.resolve(resolver::STRUCTURE_ATTEMPTS, MapFile::Structures, file_versions)
            })
            .map(Vec::as_slice)
    }

    pub fn droids(&mut self) -> Option<&[Droid]> {
        let Self {
            source,
            droids,
            file_versions,
            ..
        } = self;
        droids
            .get_or_resolve(|| source.resolve(resolver::DROID_ATTEMPTS, MapFile::Droids, file_versions))
            .map(Vec::as_slice)
    }

    pub fn features(&mut self) -> Option<&[Feature]> {
        let Self {
            source,
            features,
            file_versions,
            ..
        } = self;
        features
            .get_or_resolve(|| {
                source.resolve(resolver::FEATURE_ATTEMPTS, MapFile::Features, file_versions)
            })
            .map(Vec::as_slice)
    }

    /// Resolve every part. `None` if any part is unavailable.
    pub fn contents(&mut self) -> Option<MapContents<'_>> {
        self.map_data()?;
        self.terrain_types()?;
        self.structures()?;
        self.droids()?;
        self.features()?;
        Some(MapContents {
            map_data: self.map_data.get()?,
            terrain_types: self.terrain_types.get()?,
            structures: self.structures.get()?,
            droids: self.droids.get()?,
            features: self.features.get()?,
        })
    }

    /// Codec and version each resolved file came from.
    pub fn file_version(&self, file: MapFile) -> Option<LoadedFileVersion> {
        self.file_versions.get(&file).copied()
    }

    /// Generation the map was loaded from. Resolves every part first.
    pub fn loaded_map_format(&mut self) -> Option<LoadedFormat> {
        self.contents()?;
        if self.script_generated {
            return Some(LoadedFormat::ScriptGenerated);
        }
        resolver::classify(&self.file_versions)
    }

    /// Order-sensitive hash of tiles, structures, droids and features.
    ///
    /// Parts that fail to resolve contribute nothing.
    pub fn checksum(&mut self) -> u64 {
        let mut sum = MapChecksum::new();
        if let Some(map_data) = self.map_data() {
            sum.tiles(map_data);
        }
        if let Some(structures) = self.structures() {
            sum.structures(structures);
        }
        if let Some(droids) = self.droids() {
            sum.droids(droids);
        }
        if let Some(features) = self.features() {
            sum.features(features);
        }
        sum.digest()
    }
}
