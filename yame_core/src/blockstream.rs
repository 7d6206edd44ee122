//! The external block-stream layer's interface: a seekable byte stream with
//! opaque virtual offsets. Real deployments might back this with BGZF; here
//! it is a plain file, using direct `File` + `Seek`/`SeekFrom` offset
//! bookkeeping rather than a fabricated BGZF port.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub trait BlockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// The current position, usable later as an opaque argument to `seek`.
    fn tell(&mut self) -> io::Result<u64>;
    fn seek(&mut self, offset: u64) -> io::Result<()>;
}

/// A `BlockStream` over a plain seekable file: direct `File` +
/// `Seek`/`SeekFrom` usage, no intermediate buffering, so `tell` always
/// reflects the real file cursor.
pub struct FileBlockStream {
    file: File,
}

impl FileBlockStream {
    pub fn open_read(path: &Path) -> io::Result<Self> {
        Ok(FileBlockStream { file: File::open(path)? })
    }

    pub fn open_write(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        Ok(FileBlockStream { file })
    }

    pub fn open_append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        Ok(FileBlockStream { file })
    }
}

impl BlockStream for FileBlockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}
