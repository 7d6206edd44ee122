//! Format 6 — set + universe. 2 bits per row, 4 rows per
//! byte, low bits first. Inflated and compressed layouts are identical;
//! `compress` is a marker-only transition.

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;
use yame_core::record::nbytes;

const NA: u8 = 0b00;
const ZERO: u8 = 0b10;
const ONE: u8 = 0b11;
/// `01` is reserved; the core must never emit it.
const RESERVED: u8 = 0b01;

fn code_at(payload: &[u8], i: u64) -> u8 {
    let byte = payload[(i >> 2) as usize];
    (byte >> ((i & 3) * 2)) & 0b11
}

fn set_code(payload: &mut [u8], i: u64, code: u8) {
    let idx = (i >> 2) as usize;
    let shift = (i & 3) * 2;
    payload[idx] &= !(0b11 << shift);
    payload[idx] |= (code & 0b11) << shift;
}

pub fn compress(col: Column<Inflated>) -> Result<Column<Serialized>, Error> {
    for i in 0..col.rows() {
        if code_at(col.payload(), i) == RESERVED {
            return Err(Error::CodecViolation { detail: format!("format 6 row {i} carries reserved code 01") });
        }
    }
    let rows = col.rows();
    Ok(Column::new_serialized(Format::SetUniverse, rows, None, col.into_payload()))
}

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let rows = col.rows();
    let want = nbytes(Format::SetUniverse, rows) as usize;
    if col.payload().len() != want {
        return Err(Error::ShortRead { context: "format 6 payload", want, got: col.payload().len() });
    }
    Ok(Column::new_inflated(Format::SetUniverse, rows, None, col.into_payload()))
}

pub fn in_uni(col: &Column<Inflated>, i: u64) -> bool {
    code_at(col.payload(), i) != NA
}

pub fn in_set(col: &Column<Inflated>, i: u64) -> bool {
    code_at(col.payload(), i) == ONE
}

pub fn set_na(col: &mut Column<Inflated>, i: u64) {
    set_code(col.payload_mut(), i, NA);
}

pub fn set_0(col: &mut Column<Inflated>, i: u64) {
    set_code(col.payload_mut(), i, ZERO);
}

pub fn set_1(col: &mut Column<Inflated>, i: u64) {
    set_code(col.payload_mut(), i, ONE);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_col(rows: u64, bytes: Vec<u8>) -> Column<Inflated> {
        Column::new_inflated(Format::SetUniverse, rows, None, bytes)
    }

    #[test]
    fn accessors_read_packed_codes() {
        // row0=NA(00), row1=0(10), row2=1(11), row3=NA(00) -> byte 0b00_11_10_00
        let col = new_col(4, vec![0b0011_1000]);
        assert!(!in_uni(&col, 0));
        assert!(in_uni(&col, 1));
        assert!(!in_set(&col, 1));
        assert!(in_uni(&col, 2));
        assert!(in_set(&col, 2));
        assert!(!in_uni(&col, 3));
    }

    #[test]
    fn compress_rejects_reserved_code() {
        let col = new_col(1, vec![0b0000_0001]);
        assert!(matches!(compress(col), Err(Error::CodecViolation { .. })));
    }

    #[test]
    fn compress_accepts_valid_codes() {
        let col = new_col(4, vec![0b0011_1000]);
        assert!(compress(col).is_ok());
    }
}
