//! Archive-backed provider for packaged maps.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Mutex;

use zip::ZipArchive;

use super::{IoProvider, MapStream, ReadStream};

/// Most bytes reserved up front for one entry; larger entries grow while reading.
const MAX_ENTRY_PREALLOC: u64 = 8 * 1024 * 1024;

/// Buffer capacity for an entry whose header claims `declared` bytes.
pub(crate) fn entry_capacity(declared: u64) -> usize {
    declared.min(MAX_ENTRY_PREALLOC) as usize
}

/// Reads entries out of a zip archive.
///
/// Entries are decompressed into memory when opened, so streams do not borrow the
/// archive. Writing is not supported.
pub struct ZipIoProvider<R: Read + Seek + Send> {
    archive: Mutex<ZipArchive<R>>,
}

impl ZipIoProvider<BufReader<File>> {
    /// Open an archive on disk.
    pub fn open(path: impl AsRef<Path>) -> zip::result::ZipResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl ZipIoProvider<Cursor<Vec<u8>>> {
    /// Wrap an archive already held in memory.
    pub fn from_bytes(data: Vec<u8>) -> zip::result::ZipResult<Self> {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: Read + Seek + Send> ZipIoProvider<R> {
    pub fn from_reader(reader: R) -> zip::result::ZipResult<Self> {
        Ok(Self {
            archive: Mutex::new(ZipArchive::new(reader)?),
        })
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        let Ok(mut archive) = self.archive.lock() else {
            return Vec::new();
        };
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            if let Ok(file) = archive.by_index(i) {
                names.push(file.name().to_string());
            }
        }
        names
    }

    /// Folder holding the map resources: the parent of the first `game.map` or `game.wasm`.
    pub fn find_map_folder(&self) -> Option<String> {
        self.entry_names().into_iter().find_map(|name| {
            let (folder, file) = match name.rsplit_once('/') {
                Some((folder, file)) => (folder.to_string(), file.to_string()),
                None => (String::new(), name.clone()),
            };
            (file == "game.map" || file == "game.wasm").then_some(folder)
        })
    }

    fn read_entry(&self, path: &str) -> Option<Vec<u8>> {
        let mut archive = self.archive.lock().ok()?;
        let mut file = archive.by_name(path).ok()?;
        if file.is_dir() {
            return None;
        }
        let mut data = Vec::with_capacity(entry_capacity(file.size()));
        file.read_to_end(&mut data).ok()?;
        Some(data)
    }
}

impl<R: Read + Seek + Send> IoProvider for ZipIoProvider<R> {
    fn open_for_read(&self, path: &str) -> Option<Box<dyn MapStream>> {
        let data = self.read_entry(path)?;
        Some(Box::new(ReadStream::new(Cursor::new(data))))
    }

    fn open_for_write(&self, path: &str) -> Option<Box<dyn MapStream>> {
        tracing::warn!("cannot write {:?}: map archives are read-only", path);
        None
    }

    fn make_directory(&self, _path: &str) -> bool {
        false
    }

    fn load_full_file(&self, path: &str) -> Option<Vec<u8>> {
        self.read_entry(path)
    }
}
