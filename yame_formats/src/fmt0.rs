//! Format 0 — dense bit vector. Inflated and compressed layouts are
//! identical; `compress` is a marker-only transition and
//! `decompress` a memcpy, matching the source's `f0_compress`/`f0_decompress`
//! no-op bodies.

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;
use yame_core::record::nbytes;

pub fn compress(col: Column<Inflated>) -> Column<Serialized> {
    let rows = col.rows();
    Column::new_serialized(Format::Bit, rows, None, col.into_payload())
}

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let rows = col.rows();
    let want = nbytes(Format::Bit, rows) as usize;
    if col.payload().len() != want {
        return Err(Error::ShortRead { context: "format 0 payload", want, got: col.payload().len() });
    }
    Ok(Column::new_inflated(Format::Bit, rows, None, col.into_payload()))
}

/// Converts a byte-per-row format-1 (ASCII RLE, already inflated) column
/// into a format-0 bit vector: bit = 1 iff value > `'0'`.
pub fn from_fmt1(rle: &Column<Inflated>) -> Column<Inflated> {
    let rows = rle.rows();
    let mut out = vec![0u8; nbytes(Format::Bit, rows) as usize];
    for (i, &byte) in rle.payload().iter().enumerate() {
        if byte > b'0' {
            out[i >> 3] |= 1 << (i & 7);
        }
    }
    Column::new_inflated(Format::Bit, rows, None, out)
}

/// Converts an inflated format-3 (M/U counts) column into a format-0 bit
/// vector: bit = 1 iff `M + U > 0`.
pub fn from_fmt3(mu: &Column<Inflated>) -> Result<Column<Inflated>, Error> {
    let unit = mu.unit().ok_or_else(|| Error::CorruptAux { detail: "format 3 column missing unit".into() })?;
    let rows = mu.rows();
    let mut out = vec![0u8; nbytes(Format::Bit, rows) as usize];
    for i in 0..rows as usize {
        let (m, u) = crate::fmt3::get_mu(mu.payload(), i, unit);
        if m + u > 0 {
            out[i >> 3] |= 1 << (i & 7);
        }
    }
    Ok(Column::new_inflated(Format::Bit, rows, None, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_decompress_is_identity() {
        let col = Column::new_inflated(Format::Bit, 12, None, vec![0b1011_0010, 0b0000_0101]);
        let payload = col.payload().to_vec();
        let serialized = compress(col);
        assert_eq!(serialized.payload(), payload.as_slice());
        let back = decompress(serialized).unwrap();
        assert_eq!(back.payload(), payload.as_slice());
    }

    #[test]
    fn decompress_rejects_short_payload() {
        let col = Column::new_serialized(Format::Bit, 16, None, vec![0u8]);
        assert!(matches!(decompress(col), Err(Error::ShortRead { .. })));
    }

    #[test]
    fn from_fmt1_thresholds_at_char_zero() {
        let rle = Column::new_inflated(Format::Rle, 4, None, vec![b'0', b'1', b'2', b'0']);
        let bits = from_fmt1(&rle);
        assert_eq!(bits.payload(), &[0b0000_0110]);
    }
}
