//! In-memory provider.

use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use super::{IoProvider, MapStream, ReadStream, WriteStream};

type FileTable = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Shared in-memory file table. Clones see the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryIoProvider {
    files: FileTable,
}

impl MemoryIoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), data.into());
        }
    }

    /// Copy of a file's current contents.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().map(|f| f.contains_key(path)).unwrap_or(false)
    }

    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.remove(path)
    }

    /// Sorted list of stored paths.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

/// Appends to one entry of the shared file table.
struct MemoryFileWriter {
    files: FileTable,
    path: String,
}

impl Write for MemoryFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("memory file table poisoned"))?;
        files.entry(self.path.clone()).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl IoProvider for MemoryIoProvider {
    fn open_for_read(&self, path: &str) -> Option<Box<dyn MapStream>> {
        let data = self.get(path)?;
        Some(Box::new(ReadStream::new(Cursor::new(data))))
    }

    fn open_for_write(&self, path: &str) -> Option<Box<dyn MapStream>> {
        self.files.lock().ok()?.insert(path.to_string(), Vec::new());
        Some(Box::new(WriteStream::new(MemoryFileWriter {
            files: Arc::clone(&self.files),
            path: path.to_string(),
        })))
    }
}
