//! Append-only writer over a YAME file: create/write/finish, minus block
//! buffering. YAME has no fixed block size, so every `write_one` call is its
//! own flush.

use crate::blockstream::{BlockStream, FileBlockStream};
use crate::column::{Column, Serialized};
use crate::error::Error;
use crate::record::RecordHeader;
use std::path::Path;

pub struct Writer {
    stream: FileBlockStream,
}

impl Writer {
    /// Creates (or truncates) the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let stream = FileBlockStream::open_write(path)
            .map_err(|source| Error::ResourceOpen { path: path.display().to_string(), source })?;
        Ok(Writer { stream })
    }

    /// Appends to an existing file, or creates it if absent.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let stream = FileBlockStream::open_append(path)
            .map_err(|source| Error::ResourceOpen { path: path.display().to_string(), source })?;
        Ok(Writer { stream })
    }

    pub fn tell(&mut self) -> Result<u64, Error> {
        self.stream.tell().map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })
    }

    /// Writes `column`'s header and payload. The column must already be
    /// `Serialized`; compressing first if still inflated is the caller's
    /// job, since the format modules own `compress`, not this facade.
    pub fn write_one(&mut self, column: &Column<Serialized>) -> Result<(), Error> {
        let header = RecordHeader { fmt: column.fmt(), n: column.header_n() };
        self.stream
            .write_all(&header.to_bytes())
            .map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })?;
        self.stream
            .write_all(column.payload())
            .map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })?;
        Ok(())
    }
}
