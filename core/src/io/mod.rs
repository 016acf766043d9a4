//! Byte-Stream Provider
//!
//! Named-resource opener with sequential little-endian access. The codecs depend only on
//! [`IoProvider`] and [`MapStream`]; where the bytes live is up to the implementation.
//!
//! # Implementations
//!
//! - [`FsIoProvider`] - plain files below a root directory
//! - [`ZipIoProvider`] - entries of a map package archive (read-only)
//! - [`MemoryIoProvider`] - in-memory file table

mod archive;
mod fs;
mod memory;
mod stream;

#[cfg(test)]
mod tests;

pub use archive::ZipIoProvider;
pub use fs::FsIoProvider;
pub use memory::MemoryIoProvider;
pub use stream::{ReadStream, WriteStream};

use byteorder::{ByteOrder, LittleEndian};

/// Sequential access to one opened resource.
///
/// Every operation reports failure as `None`; a short read is never padded.
pub trait MapStream {
    /// Read up to `buf.len()` bytes, returning how many were read (0 at end of stream).
    fn read_bytes(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Write all of `buf`, returning the number of bytes written.
    fn write_bytes(&mut self, buf: &[u8]) -> Option<usize>;

    /// True when no further bytes can be read. Must not consume anything.
    fn at_end(&mut self) -> bool;

    /// Flush buffered output. Called once writing is complete.
    fn finish(&mut self) -> Option<()> {
        Some(())
    }
}

/// Fixed-width little-endian helpers layered on [`MapStream`].
pub trait MapStreamExt: MapStream {
    /// Fill `buf` completely or fail.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Option<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_bytes(&mut buf[filled..])? {
                0 => return None,
                n => filled += n,
            }
        }
        Some(())
    }

    /// Write all of `buf` or fail.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Option<()> {
        (self.write_bytes(buf)? == buf.len()).then_some(())
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact_bytes(&mut buf)?;
        Some(buf)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|b| b[0])
    }

    fn read_i8(&mut self) -> Option<i8> {
        self.read_u8().map(|v| v as i8)
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.read_array::<2>().map(|b| LittleEndian::read_u16(&b))
    }

    fn read_i16(&mut self) -> Option<i16> {
        self.read_array::<2>().map(|b| LittleEndian::read_i16(&b))
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array::<4>().map(|b| LittleEndian::read_u32(&b))
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.read_array::<4>().map(|b| LittleEndian::read_i32(&b))
    }

    fn write_u8(&mut self, value: u8) -> Option<()> {
        self.write_all_bytes(&[value])
    }

    fn write_i8(&mut self, value: i8) -> Option<()> {
        self.write_u8(value as u8)
    }

    fn write_u16(&mut self, value: u16) -> Option<()> {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.write_all_bytes(&buf)
    }

    fn write_i16(&mut self, value: i16) -> Option<()> {
        let mut buf = [0u8; 2];
        LittleEndian::write_i16(&mut buf, value);
        self.write_all_bytes(&buf)
    }

    fn write_u32(&mut self, value: u32) -> Option<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write_all_bytes(&buf)
    }

    fn write_i32(&mut self, value: i32) -> Option<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, value);
        self.write_all_bytes(&buf)
    }
}

impl<S: MapStream + ?Sized> MapStreamExt for S {}

/// Opens named resources for reading and writing.
///
/// Providers are borrowed for the duration of a single load or save call.
pub trait IoProvider: Send {
    /// Open an existing resource for reading.
    fn open_for_read(&self, path: &str) -> Option<Box<dyn MapStream>>;

    /// Create or truncate a resource for writing.
    fn open_for_write(&self, path: &str) -> Option<Box<dyn MapStream>>;

    /// Create a directory (and parents). Providers without directories succeed trivially.
    fn make_directory(&self, _path: &str) -> bool {
        true
    }

    /// Join two path fragments with the provider's separator.
    fn path_join(&self, base: &str, name: &str) -> String {
        join_resource_path(base, name)
    }

    /// Read a whole resource. `None` if it cannot be opened or read.
    fn load_full_file(&self, path: &str) -> Option<Vec<u8>> {
        let mut stream = self.open_for_read(path)?;
        let mut data = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read_bytes(&mut chunk)? {
                0 => break,
                n => data.extend_from_slice(&chunk[..n]),
            }
        }
        Some(data)
    }

    /// Replace a resource with `data`.
    fn write_full_file(&self, path: &str, data: &[u8]) -> bool {
        let Some(mut stream) = self.open_for_write(path) else {
            return false;
        };
        stream.write_all_bytes(data).is_some() && stream.finish().is_some()
    }
}

/// `/`-joins two path fragments, tolerating an empty base and redundant separators.
pub fn join_resource_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
