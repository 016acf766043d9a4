use super::Map;
use crate::codec::{self, binary, json};
use crate::io::IoProvider;
use crate::logging::{LogLevel, MapLogger};
use crate::map_log;
use mapforge_shared::{MapType, OutputFormat};

impl Map {
    /// Write every part of this map into `folder` in the chosen generation.
    ///
    /// Parts are resolved first; export stops at the first part that cannot be resolved or
    /// written.
    pub fn export_to_path(
        &mut self,
        folder: &str,
        map_type: MapType,
        max_players: u32,
        format: OutputFormat,
        logger: &dyn MapLogger,
        io: &dyn IoProvider,
    ) -> bool {
        let source_folder = self.folder().to_string();
        let Some(contents) = self.contents() else {
            map_log!(
                logger,
                LogLevel::Error,
                "Failed to load / retrieve map from: {}",
                source_folder
            );
            return false;
        };

        if !io.make_directory(folder) {
            map_log!(logger, LogLevel::Error, "Failed to create directory: {}", folder);
            return false;
        }

        let path = |name: &str| io.path_join(folder, name);
        let written = binary::write_map_data(
            contents.map_data,
            &path(codec::MAP_DATA_FILE),
            io,
            format,
            logger,
        ) && binary::write_terrain_types(
            contents.terrain_types,
            &path(codec::TERRAIN_TYPES_FILE),
            io,
            format,
            logger,
        ) && match format.json_version() {
            None => {
                binary::write_droids(
                    contents.droids,
                    max_players,
                    &path(codec::DROIDS_BINARY_FILE),
                    io,
                    binary::DEFAULT_DROID_VERSION,
                    logger,
                ) && binary::write_features(
                    contents.features,
                    max_players,
                    &path(codec::FEATURES_BINARY_FILE),
                    io,
                    binary::DEFAULT_FEATURE_VERSION,
                    logger,
                ) && binary::write_structures(
                    contents.structures,
                    max_players,
                    &path(codec::STRUCTURES_BINARY_FILE),
                    io,
                    binary::DEFAULT_STRUCTURE_VERSION,
                    logger,
                )
            }
            Some(version) => {
                json::write_droids(
                    contents.droids,
                    map_type,
                    &path(codec::DROIDS_JSON_FILE),
                    io,
                    version,
                    logger,
                ) && json::write_features(
                    contents.features,
                    map_type,
                    &path(codec::FEATURES_JSON_FILE),
                    io,
                    version,
                    logger,
                ) && json::write_structures(
                    contents.structures,
                    map_type,
                    &path(codec::STRUCTURES_JSON_FILE),
                    io,
                    version,
                    logger,
                )
            }
        };

        if !written {
            map_log!(logger, LogLevel::Error, "Failed to write map to path: {}", folder);
        }
        written
    }
}
