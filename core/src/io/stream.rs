//! Generic stream adapters over `std::io`.

use std::io::{ErrorKind, Read, Write};

use super::MapStream;

/// Read-only stream over any [`Read`].
///
/// End of stream can only be detected by attempting a read, so [`MapStream::at_end`]
/// probes one byte and keeps it for the next read.
pub struct ReadStream<R: Read> {
    reader: R,
    peeked: Option<u8>,
}

impl<R: Read> ReadStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            peeked: None,
        }
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Option<usize> {
        loop {
            match self.reader.read(buf) {
                Ok(n) => return Some(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("stream read failed: {}", e);
                    return None;
                }
            }
        }
    }
}

impl<R: Read> MapStream for ReadStream<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Option<usize> {
        if buf.is_empty() {
            return Some(0);
        }
        let mut offset = 0;
        if let Some(byte) = self.peeked.take() {
            buf[0] = byte;
            offset = 1;
        }
        // Keep reading until the buffer is full or the reader is exhausted.
        while offset < buf.len() {
            match self.read_inner(&mut buf[offset..]) {
                Some(0) => break,
                Some(n) => offset += n,
                None if offset > 0 => break,
                None => return None,
            }
        }
        Some(offset)
    }

    fn write_bytes(&mut self, _buf: &[u8]) -> Option<usize> {
        None
    }

    fn at_end(&mut self) -> bool {
        if self.peeked.is_some() {
            return false;
        }
        let mut probe = [0u8; 1];
        match self.read_inner(&mut probe) {
            Some(1) => {
                self.peeked = Some(probe[0]);
                false
            }
            _ => true,
        }
    }
}

/// Write-only stream over any [`Write`].
pub struct WriteStream<W: Write> {
    writer: W,
}

impl<W: Write> WriteStream<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> MapStream for WriteStream<W> {
    fn read_bytes(&mut self, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Option<usize> {
        match self.writer.write_all(buf) {
            Ok(()) => Some(buf.len()),
            Err(e) => {
                tracing::debug!("stream write failed: {}", e);
                None
            }
        }
    }

    fn at_end(&mut self) -> bool {
        true
    }

    fn finish(&mut self) -> Option<()> {
        self.writer.flush().ok()
    }
}

impl<W: Write> Drop for WriteStream<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
