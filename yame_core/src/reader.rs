//! Sequential / random-access reader over a YAME file. Unlike a fixed-size
//! block index, YAME's records are self-framing: each carries its own
//! header, so random access needs either a known byte offset (from a sample
//! index) or a sequential walk.

use crate::blockstream::{BlockStream, FileBlockStream};
use crate::column::{Column, Serialized};
use crate::error::Error;
use crate::index::SampleIndex;
use crate::record::RecordHeader;
use std::path::Path;

/// Wraps a block stream plus a running sample counter.
pub struct Reader {
    stream: FileBlockStream,
    /// Number of records returned by `read_next` so far.
    samples_read: u64,
}

impl Reader {
    /// Opens `path` for reading. `"-"` is reserved for stdin in the CLI
    /// layer; this facade only opens real files.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let stream = FileBlockStream::open_read(path)
            .map_err(|source| Error::ResourceOpen { path: path.display().to_string(), source })?;
        Ok(Reader { stream, samples_read: 0 })
    }

    /// Current byte offset, usable later with [`Reader::read_by_offsets`].
    pub fn tell(&mut self) -> Result<u64, Error> {
        self.stream.tell().map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })
    }

    fn seek(&mut self, offset: u64) -> Result<(), Error> {
        self.stream.seek(offset).map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })
    }

    /// Reads one record at the current position. Returns `Ok(None)` at a
    /// graceful end-of-stream.
    ///
    /// The returned column's `rows()` is the header's raw `n` field: the
    /// true row count for formats 0/6, but the compressed payload's byte
    /// length for every other format (see [`Column::rows`]'s doc) — this
    /// method never decodes the payload, so it cannot know the logical row
    /// count for those formats any sooner than decompression does.
    pub fn read_next(&mut self) -> Result<Option<Column<Serialized>>, Error> {
        let header = match RecordHeader::read_from(&mut StreamRead(&mut self.stream))? {
            Some(h) => h,
            None => return Ok(None),
        };
        let payload_len = crate::record::nbytes(header.fmt, header.n) as usize;
        let mut payload = vec![0u8; payload_len];
        read_exact(&mut self.stream, &mut payload)?;
        self.samples_read += 1;
        Ok(Some(Column::new_serialized(header.fmt, header.n, None, payload)))
    }

    /// Number of records yielded by `read_next` so far in this reader's life.
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Reads records `[beg, end)` by sample position, counting from the
    /// stream's current position. Requires a sequential walk since records
    /// are not uniformly sized.
    pub fn read_range(&mut self, beg: u64, end: u64) -> Result<Vec<Column<Serialized>>, Error> {
        if end < beg {
            return Err(Error::CodecViolation { detail: format!("read_range: end {end} < beg {beg}") });
        }
        for _ in 0..beg {
            if self.read_next()?.is_none() {
                return Ok(Vec::new());
            }
        }
        let mut out = Vec::with_capacity((end - beg) as usize);
        for _ in beg..end {
            match self.read_next()? {
                Some(col) => out.push(col),
                None => break,
            }
        }
        Ok(out)
    }

    /// The first `n` records from the stream's current position.
    pub fn read_head(&mut self, n: u64) -> Result<Vec<Column<Serialized>>, Error> {
        self.read_range(0, n)
    }

    /// The last `n` records, resolved via a sample index (a sequential stream
    /// alone cannot know where the end is without walking it once first).
    pub fn read_tail(&mut self, n: u64, index: &SampleIndex) -> Result<Vec<Column<Serialized>>, Error> {
        let total = index.len() as u64;
        let beg = total.saturating_sub(n);
        let offsets: Vec<u64> = index.pairs()[beg as usize..].iter().map(|(_, off)| *off).collect();
        self.read_by_offsets(&offsets)
    }

    /// Reads one record at each of `offsets`, in the order given.
    pub fn read_by_offsets(&mut self, offsets: &[u64]) -> Result<Vec<Column<Serialized>>, Error> {
        let mut out = Vec::with_capacity(offsets.len());
        for &offset in offsets {
            self.seek(offset)?;
            match self.read_next()? {
                Some(col) => out.push(col),
                None => return Err(Error::ShortRead { context: "read_by_offsets", want: 1, got: 0 }),
            }
        }
        Ok(out)
    }

    /// Resolves `names` against `index`, then reads each in order.
    pub fn read_by_names(&mut self, index: &SampleIndex, names: &[&str]) -> Result<Vec<Column<Serialized>>, Error> {
        let mut offsets = Vec::with_capacity(names.len());
        for &name in names {
            let offset = index
                .get(name)
                .ok_or_else(|| Error::CorruptAux { detail: format!("sample name not indexed: {name}") })?;
            offsets.push(offset);
        }
        self.read_by_offsets(&offsets)
    }
}

/// Adapts a [`BlockStream`] to `std::io::Read`, the shape
/// `RecordHeader::read_from` expects.
struct StreamRead<'a>(&'a mut FileBlockStream);

impl<'a> std::io::Read for StreamRead<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

fn read_exact(stream: &mut FileBlockStream, buf: &mut [u8]) -> Result<(), Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream
            .read(&mut buf[filled..])
            .map_err(|source| Error::ResourceOpen { path: "<stream>".into(), source })?;
        if n == 0 {
            return Err(Error::ShortRead { context: "record payload", want: buf.len(), got: filled });
        }
        filled += n;
    }
    Ok(())
}
