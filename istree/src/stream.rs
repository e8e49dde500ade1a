//! The `Stream` external-collaborator abstraction a codec reads from and
//! writes to, plus the two concrete implementations most callers need.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

/// A seekable byte sink/source a [`Codec`](crate::codec::Codec) operates
/// over, abstracting over in-memory buffers and files alike (base spec §3
/// "Stream").
pub trait Stream: Read + Write {
    /// Current read/write position, in bytes from the start.
    fn position(&mut self) -> Result<u64>;

    /// Total length in bytes.
    fn size(&mut self) -> Result<u64>;

    /// Moves the read/write position to `pos`.
    fn set_position(&mut self, pos: u64) -> Result<()>;

    /// Truncates to empty and resets the position to zero.
    fn clear(&mut self) -> Result<()>;
}

/// An in-memory, growable byte buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    buf: Vec<u8>,
    pos: usize,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self { buf, pos: 0 }
    }

    /// Loads the entirety of `path` into a fresh buffer, positioned at the
    /// start.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_vec(std::fs::read(path)?))
    }

    /// Writes the buffer's full contents to `path`, overwriting it.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.buf)?;
        Ok(())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = &self.buf[self.pos.min(self.buf.len())..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let end = self.pos + buf.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for MemoryStream {
    fn position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.buf.len() as u64)
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        self.pos = pos as usize;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buf.clear();
        self.pos = 0;
        Ok(())
    }
}

/// A thin wrapper making an on-disk [`File`] satisfy [`Stream`].
pub struct FileStream {
    file: File,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Stream for FileStream {
    fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_reads_back_what_it_wrote() {
        let mut s = MemoryStream::new();
        s.write_all(b"hello world").unwrap();
        s.set_position(0).unwrap();

        let mut buf = [0u8; 5];
        s.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(s.position().unwrap(), 5);
        assert_eq!(s.size().unwrap(), 11);
    }

    #[test]
    fn memory_stream_clear_resets_everything() {
        let mut s = MemoryStream::new();
        s.write_all(b"data").unwrap();
        s.clear().unwrap();
        assert_eq!(s.size().unwrap(), 0);
        assert_eq!(s.position().unwrap(), 0);
    }

    #[test]
    fn memory_stream_round_trips_through_a_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("istree_stream_test_{:p}.bin", &dir));

        let mut s = MemoryStream::new();
        s.write_all(b"round trip").unwrap();
        s.save_to_file(&path).unwrap();

        let loaded = MemoryStream::load_from_file(&path).unwrap();
        assert_eq!(loaded.as_slice(), b"round trip");

        std::fs::remove_file(&path).ok();
    }
}
