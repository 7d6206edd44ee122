//! Format 5 — legacy ternary `{0,1,2}`. Read-only: `'5'` is never written to
//! new files (`Format::is_writable`), only decoded when present in files
//! produced by older tooling.
//!
//! Compressed byte layout, one record per byte:
//! - high bit 0: lower 7 bits are a run length of NA (value 2).
//! - high bit 1: up to four 2-bit slots at offsets 6,4,2,0, each
//!   `[flag(1), value(1)]`; `flag = 0` stops the scan within the byte.
//!
//! Open Question 2's resolution: never flush a zero-length NA run. The
//! source's `last==1 && u!=0` path can emit a `(high=0, lower=0)` byte; this
//! decoder still accepts it (for files written by older tooling) but the
//! encoder here never produces one.

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;

const NA_VALUE: u8 = 2;

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let mut out = Vec::new();
    for &byte in col.payload() {
        if byte & 0x80 == 0 {
            let run = byte & 0x7f;
            out.extend(std::iter::repeat(NA_VALUE).take(run as usize));
        } else {
            for shift in [6, 4, 2, 0] {
                let slot = (byte >> shift) & 0b11;
                let flag = (slot >> 1) & 1;
                let value = slot & 1;
                if flag == 0 {
                    break;
                }
                out.push(value);
            }
        }
    }
    let rows = out.len() as u64;
    Ok(Column::new_inflated(Format::TernaryLegacy, rows, None, out))
}

/// Encodes an inflated ternary stream in the legacy layout. Not reachable
/// from the writer (format 5 [`Format::is_writable`] is false) but kept so
/// tests can exercise the decoder against known-good input and so tooling
/// that still needs to regenerate legacy fixtures has somewhere to call.
pub fn compress_for_fixture(values: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < values.len() {
        if values[i] == NA_VALUE {
            let mut run = 0u8;
            while i < values.len() && values[i] == NA_VALUE && run < 0x7f {
                run += 1;
                i += 1;
            }
            out.push(run);
        } else {
            let mut byte = 0x80u8;
            let mut shift = 6i32;
            while shift >= 0 && i < values.len() && values[i] != NA_VALUE {
                let value = values[i] & 1;
                byte |= (0b10 | value) << shift;
                shift -= 2;
                i += 1;
            }
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_na_run() {
        let col = Column::new_serialized(Format::TernaryLegacy, 0, None, vec![0b0000_0011]);
        let back = decompress(col).unwrap();
        assert_eq!(back.payload(), &[2, 2, 2]);
    }

    #[test]
    fn decodes_packed_slots_stopping_at_flag_zero() {
        // slots: (1,0) (1,1) then flag=0 stop
        let byte = 0b1011_0000;
        let col = Column::new_serialized(Format::TernaryLegacy, 0, None, vec![byte]);
        let back = decompress(col).unwrap();
        assert_eq!(back.payload(), &[0, 1]);
    }

    #[test]
    fn round_trips_through_fixture_encoder() {
        let values = vec![0u8, 1, 1, 0, 2, 2, 2, 2, 1];
        let encoded = compress_for_fixture(&values);
        let col = Column::new_serialized(Format::TernaryLegacy, 0, None, encoded);
        let back = decompress(col).unwrap();
        assert_eq!(back.payload(), values.as_slice());
    }

    #[test]
    fn format_5_is_not_writable() {
        assert!(!Format::TernaryLegacy.is_writable());
    }
}
