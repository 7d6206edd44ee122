//! Format 1 — ASCII run-length stream. Compressed records are
//! `[value(1) | run(2, little-endian)]`; runs split at `1 << 15` and the
//! on-disk header `n` is the *byte length* of the compressed stream, not the
//! row count.

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;

const MAX_RUN: u32 = 1 << 15;

pub fn compress(col: Column<Inflated>) -> Column<Serialized> {
    let rows = col.rows();
    let bytes = col.payload();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let value = bytes[i];
        let mut run: u32 = 1;
        while i + (run as usize) < bytes.len() && bytes[i + run as usize] == value && run < MAX_RUN {
            run += 1;
        }
        out.push(value);
        out.extend_from_slice(&(run as u16).to_le_bytes());
        i += run as usize;
    }
    Column::new_serialized(Format::Rle, rows, None, out)
}

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let payload = col.payload();
    if payload.len() % 3 != 0 {
        return Err(Error::CorruptAux { detail: format!("format 1 stream length {} not a multiple of 3", payload.len()) });
    }
    let mut out = Vec::new();
    for record in payload.chunks_exact(3) {
        let value = record[0];
        let run = u16::from_le_bytes([record[1], record[2]]);
        out.extend(std::iter::repeat(value).take(run as usize));
    }
    let rows = out.len() as u64;
    Ok(Column::new_inflated(Format::Rle, rows, None, out))
}
