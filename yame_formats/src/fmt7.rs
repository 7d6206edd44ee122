//! Format 7 — genomic coordinates.
//!
//! Two in-memory shapes exist for this format, both carried through the
//! crate's `Inflated`/`Serialized` typestate even though neither is a
//! fixed-width "one value per row" layout in the usual sense:
//!
//! - `Column<Serialized>`: the on-disk, delta-encoded stream, always
//!   compressed. `[chrName '\0' delta* 0xFF]*`.
//! - `Column<Inflated>`: the indexed, random-access-friendly layout the
//!   source's `fmt7_decompress` builds — a double-NUL-terminated chromosome
//!   name table followed by fixed 8-byte `(chrId: u16, pos1: u48)` entries,
//!   little-endian (`unit = Some(Unit::U8)`). This is what the source calls
//!   "decompressed/indexed", matching its `compressed == 0` flag.

use std::collections::HashMap;

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;
use yame_core::row_finder::{RowFinder, RowLoc};
use yame_core::unit::Unit;

const END_OF_CHROM: u8 = 0xFF;
const MAX_DELTA_8BYTE: u64 = (1u64 << 62) - 1;

fn append_chrom(out: &mut Vec<u8>, chrom: &str) {
    out.extend_from_slice(chrom.as_bytes());
    out.push(0);
}

fn append_end(out: &mut Vec<u8>) {
    out.push(END_OF_CHROM);
}

/// Encodes one delta in its 1/2/8-byte variable-width form, selected by
/// the lead bits of the first byte.
fn append_loc(out: &mut Vec<u8>, delta: u64) -> Result<(), Error> {
    if delta <= 0x7f {
        out.push(delta as u8);
    } else if delta <= 0x3fff {
        out.push(0x80 | ((delta >> 8) as u8));
        out.push((delta & 0xff) as u8);
    } else if delta <= MAX_DELTA_8BYTE {
        let mut bytes = [0u8; 8];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = ((delta >> (8 * (7 - i))) & 0xff) as u8;
        }
        bytes[0] |= 0xc0;
        out.extend_from_slice(&bytes);
    } else {
        return Err(Error::CodecViolation {
            detail: format!("format 7 inter-loci distance {delta} exceeds maximum"),
        });
    }
    Ok(())
}

/// Sequential decode cursor over a compressed format-7 stream, promoted
/// from the source's `row_reader_t` embedded-`void*`-aux pattern to an
/// explicit value.
pub struct CoordCursor<'a> {
    payload: &'a [u8],
    loc: usize,
    index: u64,
    value: u64,
    chrom_start: usize,
    chrom_end: usize,
}

impl<'a> CoordCursor<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        CoordCursor { payload, loc: 0, index: 0, value: 0, chrom_start: 0, chrom_end: 0 }
    }

    /// Advances one row. Returns `Ok(None)` at a clean end of stream.
    pub fn next(&mut self) -> Result<Option<(&'a str, u64, u64)>, Error> {
        if self.loc >= self.payload.len() {
            return Ok(None);
        }
        if self.index == 0 || self.payload[self.loc] == END_OF_CHROM {
            if self.payload[self.loc] == END_OF_CHROM {
                self.loc += 1;
            }
            let start = self.loc;
            let nul = self.payload[start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::ShortRead {
                    context: "format 7 chromosome name",
                    want: 1,
                    got: 0,
                })?;
            self.chrom_start = start;
            self.chrom_end = start + nul;
            self.loc = self.chrom_end + 1;
            self.value = 0;
        }
        let tag = self.payload[self.loc] >> 6;
        let delta = if tag == 0b11 {
            let bytes =
                self.payload.get(self.loc..self.loc + 8).ok_or_else(|| Error::ShortRead {
                    context: "format 7 8-byte delta",
                    want: 8,
                    got: self.payload.len() - self.loc,
                })?;
            let mut d = ((bytes[0] & 0x3f) as u64) << 56;
            for (i, &b) in bytes.iter().enumerate().skip(1) {
                d |= (b as u64) << (8 * (7 - i));
            }
            self.loc += 8;
            d
        } else if tag == 0b10 {
            let bytes =
                self.payload.get(self.loc..self.loc + 2).ok_or_else(|| Error::ShortRead {
                    context: "format 7 2-byte delta",
                    want: 2,
                    got: self.payload.len() - self.loc,
                })?;
            let d = (((bytes[0] & 0x3f) as u64) << 8) | bytes[1] as u64;
            self.loc += 2;
            d
        } else {
            let d = (self.payload[self.loc] & 0x7f) as u64;
            self.loc += 1;
            d
        };
        self.value += delta;
        self.index += 1;
        let chrom = std::str::from_utf8(&self.payload[self.chrom_start..self.chrom_end])
            .map_err(|_| Error::CorruptAux {
                detail: "format 7 chromosome name is not valid UTF-8".into(),
            })?;
        Ok(Some((chrom, self.value, self.index)))
    }
}

/// `fmt7_read_raw`: turns an iterator of `(chrom, pos0)` text rows into a
/// compressed column. A new chromosome section starts on a name change *or*
/// a position regression (preserved as a known latent quirk, not silently fixed).
pub fn raw_from_lines<'a, I>(lines: I) -> Result<Column<Serialized>, Error>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut out = Vec::new();
    let mut chrm: Option<&str> = None;
    let mut last: u64 = 0;
    let mut rows: u64 = 0;
    for (chrom, pos0) in lines {
        let loc = pos0 + 1;
        if chrm != Some(chrom) || loc < last {
            if chrm.is_some() {
                append_end(&mut out);
            }
            append_chrom(&mut out, chrom);
            chrm = Some(chrom);
            last = 0;
        }
        append_loc(&mut out, loc - last)?;
        last = loc;
        rows += 1;
    }
    Ok(Column::new_serialized(Format::Coordinates, rows, None, out))
}

/// `fmt7_data_length`: counts rows by walking the compressed stream once.
pub fn row_count(col: &Column<Serialized>) -> Result<u64, Error> {
    let mut cursor = CoordCursor::new(col.payload());
    let mut n = 0u64;
    while cursor.next()?.is_some() {
        n += 1;
    }
    Ok(n)
}

fn parse_name_table(payload: &[u8]) -> Result<(Vec<&str>, usize), Error> {
    if payload.is_empty() {
        return Err(Error::CorruptAux { detail: "format 7 indexed column is empty".into() });
    }
    if payload[0] == 0 {
        return Ok((Vec::new(), 1));
    }
    let mut names = Vec::new();
    let mut i = 0usize;
    loop {
        let start = i;
        loop {
            let b = *payload.get(i).ok_or_else(|| Error::CorruptAux {
                detail: "format 7 name table truncated".into(),
            })?;
            if b == 0 {
                break;
            }
            i += 1;
        }
        names.push(std::str::from_utf8(&payload[start..i]).map_err(|_| Error::CorruptAux {
            detail: "format 7 chromosome name is not valid UTF-8".into(),
        })?);
        i += 1;
        if payload.get(i).copied() == Some(0) {
            i += 1;
            break;
        }
    }
    Ok((names, i))
}

/// Borrowed view over an indexed (`Inflated`) format-7 column's chromosome
/// table and packed entries.
pub struct IndexedView<'a> {
    pub chrom_names: Vec<&'a str>,
    entries: &'a [u8],
}

pub fn indexed_view(col: &Column<Inflated>) -> Result<IndexedView<'_>, Error> {
    let payload = col.payload();
    let (chrom_names, entries_start) = parse_name_table(payload)?;
    Ok(IndexedView { chrom_names, entries: &payload[entries_start..] })
}

/// `FMT7_GET_LOC`: decodes the `(chrId, pos1)` pair at indexed-form row `i`
/// (0-based).
pub fn get_loc(view: &IndexedView<'_>, i: u64) -> Result<(u16, u64), Error> {
    let start = i as usize * 8;
    let bytes = view.entries.get(start..start + 8).ok_or_else(|| Error::ShapeMismatch {
        left: i,
        right: (view.entries.len() / 8) as u64,
    })?;
    let chr_id = u16::from_le_bytes([bytes[0], bytes[1]]);
    let mut buf = [0u8; 8];
    buf[..6].copy_from_slice(&bytes[2..8]);
    Ok((chr_id, u64::from_le_bytes(buf)))
}

/// `fmt7_decompress`: builds the indexed in-memory layout by walking the
/// compressed stream once, assigning each chromosome *section* (not each
/// distinct name) a sequential id — so an unsorted input that revisits a
/// chromosome name gets two distinct ids for it, matching the source.
pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let mut cursor = CoordCursor::new(col.payload());
    let mut chrom_names: Vec<String> = Vec::new();
    let mut entries: Vec<(u16, u64)> = Vec::new();
    let mut last_section_start: Option<usize> = None;
    while let Some((chrom, pos1, _idx)) = cursor.next()? {
        if last_section_start != Some(cursor.chrom_start) {
            chrom_names.push(chrom.to_string());
            last_section_start = Some(cursor.chrom_start);
        }
        let chr_id = (chrom_names.len() - 1) as u16;
        entries.push((chr_id, pos1));
    }

    let mut out = Vec::new();
    for name in &chrom_names {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    out.push(0);
    for &(chr_id, pos1) in &entries {
        out.extend_from_slice(&chr_id.to_le_bytes());
        let pos48 = pos1 & 0xFFFF_FFFF_FFFF;
        out.extend_from_slice(&pos48.to_le_bytes()[..6]);
    }

    Ok(Column::new_inflated(Format::Coordinates, entries.len() as u64, Some(Unit::U8), out))
}

/// `fmt7_sliceToIndices`'s inverse direction: re-encodes an indexed column
/// back into the compressed delta stream.
pub fn compress(col: Column<Inflated>) -> Result<Column<Serialized>, Error> {
    let rows = col.rows();
    let view = indexed_view(&col)?;
    let mut out = Vec::new();
    let mut last = 0u64;
    let mut current_chr: Option<u16> = None;
    for i in 0..rows {
        let (chr_id, pos1) = get_loc(&view, i)?;
        if current_chr != Some(chr_id) {
            if current_chr.is_some() {
                append_end(&mut out);
            }
            let name = view.chrom_names.get(chr_id as usize).ok_or_else(|| {
                Error::CorruptAux { detail: format!("format 7 chr_id {chr_id} out of range") }
            })?;
            append_chrom(&mut out, name);
            current_chr = Some(chr_id);
            last = 0;
        }
        append_loc(&mut out, pos1 - last)?;
        last = pos1;
    }
    Ok(Column::new_serialized(Format::Coordinates, rows, None, out))
}

/// `fmt7_sliceToBlock`: rows `[beg, end]`, both 0-based inclusive. `end` is
/// clamped to the last row; `beg` past the end is fatal.
pub fn slice_range(col: &Column<Serialized>, beg: u64, end: u64) -> Result<Column<Serialized>, Error> {
    let n0 = row_count(col)?;
    if n0 == 0 || beg > n0 - 1 {
        return Err(Error::ShapeMismatch { left: beg, right: n0.saturating_sub(1) });
    }
    let end = end.min(n0 - 1);

    let mut cursor = CoordCursor::new(col.payload());
    let mut out = Vec::new();
    let mut last = 0u64;
    let mut current_section: Option<usize> = None;
    let mut i = 0u64;
    let mut n_rec = 0u64;
    while let Some((chrom, pos1, _idx)) = cursor.next()? {
        if i >= beg && i <= end {
            if current_section != Some(cursor.chrom_start) {
                if current_section.is_some() {
                    append_end(&mut out);
                }
                append_chrom(&mut out, chrom);
                current_section = Some(cursor.chrom_start);
                last = 0;
            }
            append_loc(&mut out, pos1 - last)?;
            n_rec += 1;
            last = pos1;
        }
        i += 1;
        if i > end {
            break;
        }
    }
    Ok(Column::new_serialized(Format::Coordinates, n_rec, None, out))
}

/// `fmt7_sliceToIndices`: `indices_1based` selects rows (in the order given)
/// from the indexed form; a chromosome change *or* a position regression
/// starts a fresh section in the rebuilt stream.
pub fn slice_by_indices(
    col: &Column<Serialized>,
    indices_1based: &[u64],
) -> Result<Column<Serialized>, Error> {
    let cloned = Column::new_serialized(col.fmt(), col.rows(), col.unit(), col.payload().to_vec());
    let indexed = decompress(cloned)?;
    let view = indexed_view(&indexed)?;

    let mut out = Vec::new();
    let mut last = 0u64;
    let mut current_chr: Option<u16> = None;
    for &row in indices_1based {
        if row == 0 {
            return Err(Error::ShapeMismatch { left: row, right: indexed.rows() });
        }
        let (chr_id, pos1) = get_loc(&view, row - 1)?;
        if current_chr != Some(chr_id) || pos1 < last {
            if current_chr.is_some() {
                append_end(&mut out);
            }
            let name = view.chrom_names.get(chr_id as usize).ok_or_else(|| {
                Error::CorruptAux { detail: format!("format 7 chr_id {chr_id} out of range") }
            })?;
            append_chrom(&mut out, name);
            current_chr = Some(chr_id);
            last = 0;
        }
        append_loc(&mut out, pos1 - last)?;
        last = pos1;
    }
    Ok(Column::new_serialized(Format::Coordinates, indices_1based.len() as u64, None, out))
}

/// `fmt7_sliceToMask`: keeps rows where `mask` (a format-0 bit vector, one
/// bit per row in compressed-stream order) is set.
pub fn slice_by_mask(col: &Column<Serialized>, mask: &Column<Inflated>) -> Result<Column<Serialized>, Error> {
    if mask.fmt() != Format::Bit {
        return Err(Error::UnsupportedFormat {
            fmt: mask.fmt().as_u8(),
            context: "format 7 slice_by_mask mask",
        });
    }
    let mut cursor = CoordCursor::new(col.payload());
    let mut out = Vec::new();
    let mut last = 0u64;
    let mut current_section: Option<usize> = None;
    let mut i = 0u64;
    let mut n_rec = 0u64;
    while let Some((chrom, pos1, _idx)) = cursor.next()? {
        if i >= mask.rows() {
            return Err(Error::ShapeMismatch { left: i, right: mask.rows() });
        }
        let bit = (mask.payload()[(i >> 3) as usize] >> (i & 7)) & 1;
        if bit == 1 {
            if current_section != Some(cursor.chrom_start) {
                if current_section.is_some() {
                    append_end(&mut out);
                }
                append_chrom(&mut out, chrom);
                current_section = Some(cursor.chrom_start);
                last = 0;
            }
            append_loc(&mut out, pos1 - last)?;
            n_rec += 1;
            last = pos1;
        }
        i += 1;
    }
    Ok(Column::new_serialized(Format::Coordinates, n_rec, None, out))
}

/// Random lookup by `(chrom, pos1)` via a per-chromosome coarse index
/// bucketed at `pos1 >> 17`, grounded on
/// `original_source/src/row_finder.c`'s `init_finder`/`row_finder_search`.
pub struct CoordFinder {
    finder: RowFinder,
    chroms: HashMap<String, Vec<RowLoc>>,
}

/// Builds a [`CoordFinder`] from one sequential walk over `col`.
pub fn build_finder(col: &Column<Serialized>) -> Result<CoordFinder, Error> {
    let mut cursor = CoordCursor::new(col.payload());
    let mut order: Vec<(String, Vec<RowLoc>)> = Vec::new();
    let mut current: Option<(String, Vec<RowLoc>)> = None;
    while let Some((chrom, pos1, idx)) = cursor.next()? {
        match &mut current {
            Some((name, locs)) if name == chrom => {
                locs.push(RowLoc { pos1, row_index: idx });
            }
            _ => {
                if let Some(prev) = current.take() {
                    order.push(prev);
                }
                current = Some((chrom.to_string(), vec![RowLoc { pos1, row_index: idx }]));
            }
        }
    }
    if let Some(prev) = current.take() {
        order.push(prev);
    }
    let chroms: HashMap<String, Vec<RowLoc>> = order.iter().cloned().collect();
    let finder = RowFinder::build(order)?;
    Ok(CoordFinder { finder, chroms })
}

impl CoordFinder {
    /// `row_finder_search`: the row index (1-based, matching the source's
    /// `rdr.index`) of the row whose position exactly equals `beg1` within
    /// `chrom`, or `None` if absent.
    pub fn find_row(&self, chrom: &str, beg1: u64) -> Result<Option<u64>, Error> {
        let locs = self
            .chroms
            .get(chrom)
            .ok_or_else(|| Error::CorruptAux { detail: format!("chromosome {chrom} not indexed") })?;
        self.finder.find_row(chrom, beg1, |from_index| {
            locs.iter().filter(move |l| l.row_index >= from_index).copied().collect::<Vec<_>>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest(rows: &[(&str, u64)]) -> Column<Serialized> {
        raw_from_lines(rows.iter().map(|&(c, p)| (c, p))).unwrap()
    }

    #[test]
    fn delta_encoding_matches_worked_example() {
        let col = ingest(&[("chr1", 100), ("chr1", 227), ("chr1", 4327), ("chr2", 50)]);
        let payload = col.payload();
        let mut expected = Vec::new();
        expected.extend_from_slice(b"chr1\0");
        expected.push(0x65); // delta 101
        expected.push(0x7F); // delta 127
        expected.extend_from_slice(&[0x90, 0x04]); // delta 4100
        expected.push(0xFF);
        expected.extend_from_slice(b"chr2\0");
        expected.push(0x33); // delta 51
        assert_eq!(payload, expected.as_slice());
    }

    #[test]
    fn sequential_cursor_yields_ingested_order() {
        let rows = [("chr1", 100u64), ("chr1", 227), ("chr1", 4327), ("chr2", 50)];
        let col = ingest(&rows);
        let mut cursor = CoordCursor::new(col.payload());
        let mut seen = Vec::new();
        while let Some((chrom, pos1, _idx)) = cursor.next().unwrap() {
            seen.push((chrom.to_string(), pos1));
        }
        let expected: Vec<(String, u64)> =
            rows.iter().map(|&(c, p)| (c.to_string(), p + 1)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn decompress_then_compress_round_trips() {
        let rows = [("chr1", 100u64), ("chr1", 227), ("chr2", 50)];
        let col = ingest(&rows);
        let original_payload = col.payload().to_vec();
        let indexed = decompress(Column::new_serialized(col.fmt(), col.rows(), col.unit(), col.payload().to_vec())).unwrap();
        assert_eq!(indexed.rows(), 3);
        let view = indexed_view(&indexed).unwrap();
        assert_eq!(view.chrom_names, vec!["chr1", "chr2"]);
        let back = compress(indexed).unwrap();
        assert_eq!(back.payload(), original_payload.as_slice());
    }

    #[test]
    fn slice_range_preserves_chrom_boundaries() {
        let rows = [("chr1", 100u64), ("chr1", 227), ("chr1", 4327), ("chr2", 50), ("chr2", 80)];
        let col = ingest(&rows);
        let sliced = slice_range(&col, 1, 3).unwrap();
        let mut cursor = CoordCursor::new(sliced.payload());
        let mut seen = Vec::new();
        while let Some((chrom, pos1, _)) = cursor.next().unwrap() {
            seen.push((chrom.to_string(), pos1));
        }
        assert_eq!(
            seen,
            vec![("chr1".to_string(), 228), ("chr1".to_string(), 4328), ("chr2".to_string(), 51)]
        );
    }

    #[test]
    fn slice_by_indices_reorders_and_splits_on_regression() {
        let rows = [("chr1", 100u64), ("chr1", 227), ("chr1", 4327)];
        let col = ingest(&rows);
        // request row 3 (pos 4328) then row 1 (pos 101): position regresses,
        // so a fresh section must start even though the chromosome is the same.
        let sliced = slice_by_indices(&col, &[3, 1]).unwrap();
        let mut cursor = CoordCursor::new(sliced.payload());
        let mut seen = Vec::new();
        while let Some((chrom, pos1, _)) = cursor.next().unwrap() {
            seen.push((chrom.to_string(), pos1));
        }
        assert_eq!(seen, vec![("chr1".to_string(), 4328), ("chr1".to_string(), 101)]);
    }

    #[test]
    fn find_row_locates_exact_position() {
        let rows: Vec<(&str, u64)> = (0..2000).map(|i| ("chr1", i * 100)).collect();
        let col = ingest(&rows);
        let finder = build_finder(&col).unwrap();
        let found = finder.find_row("chr1", 100 * 500 + 1).unwrap();
        assert_eq!(found, Some(501));
    }

    #[test]
    fn find_row_missing_position_returns_none() {
        let rows = [("chr1", 100u64), ("chr1", 200), ("chr1", 300)];
        let col = ingest(&rows);
        let finder = build_finder(&col).unwrap();
        assert_eq!(finder.find_row("chr1", 150).unwrap(), None);
    }

    #[test]
    fn duplicate_chromosome_section_is_rejected_by_finder() {
        let rows = [("chr1", 100u64), ("chr2", 50), ("chr1", 10)];
        let col = ingest(&rows);
        let err = build_finder(&col).unwrap_err();
        assert!(matches!(err, Error::CorruptAux { .. }));
    }

    #[test]
    fn eight_byte_delta_round_trips() {
        let rows = [("chr1", 0u64), ("chr1", 1u64 << 40)];
        let col = ingest(&rows);
        let mut cursor = CoordCursor::new(col.payload());
        let (_, pos0, _) = cursor.next().unwrap().unwrap();
        let (_, pos1, _) = cursor.next().unwrap().unwrap();
        assert_eq!(pos0, 1);
        assert_eq!(pos1, (1u64 << 40) + 1);
    }
}
