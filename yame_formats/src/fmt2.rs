//! Format 2 — categorical states. Inflated layout is a
//! double-NUL-terminated keys section followed by a data section of `n`
//! unit-width unsigned integers indexing into the key list. Compressed
//! layout keeps the keys section verbatim and RLEs the data section.

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;
use yame_core::unit::Unit;

fn split_keys(payload: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    let mut i = 0usize;
    while i + 1 < payload.len() {
        if payload[i] == 0 && payload[i + 1] == 0 {
            return Ok((&payload[..i + 2], &payload[i + 2..]));
        }
        i += 1;
    }
    Err(Error::CorruptAux { detail: "categorical column missing double-NUL key terminator".into() })
}

/// Lazily built side structure: key boundaries borrowed into the keys
/// section, and the data section's start.
pub struct Fmt2Aux<'a> {
    keys: Vec<&'a [u8]>,
    data: &'a [u8],
    unit: Unit,
}

pub fn build_aux(col: &Column<Inflated>) -> Result<Fmt2Aux<'_>, Error> {
    let unit = col.unit().ok_or_else(|| Error::CorruptAux { detail: "categorical column missing unit".into() })?;
    let (keys_section, data) = split_keys(col.payload())?;
    let keys_only = &keys_section[..keys_section.len() - 1]; // drop trailing NUL of the double-NUL
    let mut keys: Vec<&[u8]> = keys_only.split(|&b| b == 0).collect();
    // split on every NUL leaves one extra empty slice after the final key's
    // own terminator (because keys_only still ends in a single NUL byte);
    // drop it so `keys.len()` is the true key count `nk`.
    if keys.last().map_or(false, |s| s.is_empty()) {
        keys.pop();
    }
    Ok(Fmt2Aux { keys, data, unit })
}

/// `f2_get_uint64(c, i)`: read `unit` bytes at `data + i*unit`, little-endian.
pub fn f2_get_uint64(aux: &Fmt2Aux<'_>, i: usize) -> Result<u64, Error> {
    let width = aux.unit.bytes();
    let start = i * width;
    let end = start + width;
    let slice = aux.data.get(start..end).ok_or_else(|| Error::ShapeMismatch { left: i as u64, right: (aux.data.len() / width) as u64 })?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(slice);
    Ok(u64::from_le_bytes(buf))
}

/// `f2_get_string(c, i)`: look up key index, return key string.
pub fn f2_get_string<'a>(aux: &Fmt2Aux<'a>, i: usize) -> Result<&'a [u8], Error> {
    let key_index = f2_get_uint64(aux, i)? as usize;
    aux.keys.get(key_index).copied().ok_or_else(|| Error::CorruptAux {
        detail: format!("categorical key index {key_index} out of range (nk={})", aux.keys.len()),
    })
}

pub fn compress(col: Column<Inflated>) -> Result<Column<Serialized>, Error> {
    let unit = col.unit().ok_or_else(|| Error::CorruptAux { detail: "categorical column missing unit".into() })?;
    let rows = col.rows();
    let (keys_section, data) = split_keys(col.payload())?;
    let width = unit.bytes();
    if data.len() != rows as usize * width {
        return Err(Error::ShapeMismatch { left: data.len() as u64, right: rows * width as u64 });
    }

    let mut max_value = 0u64;
    let values: Vec<u64> = data
        .chunks_exact(width)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(chunk);
            let v = u64::from_le_bytes(buf);
            max_value = max_value.max(v);
            v
        })
        .collect();
    let out_unit = Unit::minimal_for_max_value(max_value);
    let out_width = out_unit.bytes();

    let mut out = keys_section.to_vec();
    out.push(out_unit.bytes() as u8);

    const MAX_RUN: u32 = u16::MAX as u32;
    let mut i = 0usize;
    while i < values.len() {
        let value = values[i];
        let mut run: u32 = 1;
        while i + (run as usize) < values.len() && values[i + run as usize] == value && run < MAX_RUN {
            run += 1;
        }
        out.extend_from_slice(&value.to_le_bytes()[..out_width]);
        out.extend_from_slice(&(run as u16).to_le_bytes());
        i += run as usize;
    }

    Ok(Column::new_serialized(Format::Categorical, rows, Some(out_unit), out))
}

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let (keys_section, rest) = split_keys(col.payload())?;
    let unit_byte = *rest.first().ok_or_else(|| Error::CorruptAux { detail: "categorical stream missing unit byte".into() })?;
    let unit = Unit::from_byte_width(unit_byte)
        .ok_or_else(|| Error::CorruptAux { detail: format!("categorical stream has invalid unit byte {unit_byte}") })?;
    let width = unit.bytes();
    let records = &rest[1..];
    if records.len() % (width + 2) != 0 {
        return Err(Error::CorruptAux { detail: format!("categorical RLE stream length {} not a multiple of record size {}", records.len(), width + 2) });
    }

    let mut data = Vec::new();
    for record in records.chunks_exact(width + 2) {
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&record[..width]);
        let value = u64::from_le_bytes(buf);
        let run = u16::from_le_bytes([record[width], record[width + 1]]);
        for _ in 0..run {
            data.extend_from_slice(&value.to_le_bytes()[..width]);
        }
    }
    let rows = (data.len() / width) as u64;

    let mut out = keys_section.to_vec();
    out.extend_from_slice(&data);
    Ok(Column::new_inflated(Format::Categorical, rows, Some(unit), out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_inflated(keys: &[&str], values: &[u64], unit: Unit) -> Column<Inflated> {
        let mut payload = Vec::new();
        for k in keys {
            payload.extend_from_slice(k.as_bytes());
            payload.push(0);
        }
        payload.push(0);
        for &v in values {
            payload.extend_from_slice(&v.to_le_bytes()[..unit.bytes()]);
        }
        Column::new_inflated(Format::Categorical, values.len() as u64, Some(unit), payload)
    }

    #[test]
    fn round_trips_keys_and_values() {
        let col = make_inflated(&["red", "green", "blue"], &[0, 0, 0, 1, 2, 2, 2], Unit::U1);
        let serialized = compress(col).unwrap();
        let back = decompress(serialized).unwrap();
        let aux = build_aux(&back).unwrap();
        assert_eq!(f2_get_string(&aux, 0).unwrap(), b"red");
        assert_eq!(f2_get_string(&aux, 3).unwrap(), b"green");
        assert_eq!(f2_get_string(&aux, 4).unwrap(), b"blue");
        assert_eq!(back.rows(), 7);
    }

    #[test]
    fn bad_key_index_is_corrupt_aux() {
        let col = make_inflated(&["a"], &[5], Unit::U1);
        let aux = build_aux(&col).unwrap();
        assert!(matches!(f2_get_string(&aux, 0), Err(Error::CorruptAux { .. })));
    }

    #[test]
    fn unit_negotiation_picks_minimal_width() {
        let col = make_inflated(&["a", "b"], &[0, 1, 0, 1], Unit::U1);
        let serialized = compress(col).unwrap();
        assert_eq!(serialized.unit(), Some(Unit::U1));
    }

    /// Ingesting `"A","A","B","A","C","C","C"` assigns keys `{A,B,C}` and
    /// RLEs the data stream to `(0,2),(1,1),(0,1),(2,3)`.
    #[test]
    fn categorical_rle_stream_matches_ingest_order() {
        let col = make_inflated(&["A", "B", "C"], &[0, 0, 1, 0, 2, 2, 2], Unit::U1);
        let serialized = compress(col).unwrap();
        assert_eq!(serialized.unit(), Some(Unit::U1));

        let (keys_section, rest) = split_keys(serialized.payload()).unwrap();
        assert_eq!(keys_section, b"A\0B\0C\0\0");
        let unit_byte = rest[0];
        assert_eq!(unit_byte, 1);
        let records = &rest[1..];
        let expected_records: &[u8] = &[
            0, 2, 0, // (0, run=2)
            1, 1, 0, // (1, run=1)
            0, 1, 0, // (0, run=1)
            2, 3, 0, // (2, run=3)
        ];
        assert_eq!(records, expected_records);

        let back = decompress(serialized).unwrap();
        assert_eq!(back.rows(), 7);
        let aux = build_aux(&back).unwrap();
        for (i, expected) in ["A", "A", "B", "A", "C", "C", "C"].iter().enumerate() {
            assert_eq!(f2_get_string(&aux, i).unwrap(), expected.as_bytes());
        }
    }
}
