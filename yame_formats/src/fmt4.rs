//! Format 4 — float beta values with NA runs. Inflated is
//! `n` little-endian `f32`s, `-1.0` denoting NA. Compressed is a stream of
//! 32-bit words: high bit set means "lower 31 bits are an NA run length",
//! high bit clear means "this word's bit pattern is a non-NA float" (always
//! non-negative, so its own high bit is free to repurpose).

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::error::Error;
use yame_core::format::Format;

const NA: f32 = -1.0;
const NA_FLAG: u32 = 1 << 31;

pub fn compress(col: Column<Inflated>) -> Result<Column<Serialized>, Error> {
    let rows = col.rows();
    let bytes = col.payload();
    if bytes.len() != rows as usize * 4 {
        return Err(Error::ShapeMismatch { left: bytes.len() as u64, right: rows * 4 });
    }
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < rows as usize {
        let value = f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
        if value == NA {
            let mut run: u32 = 0;
            while i < rows as usize {
                let v = f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
                if v != NA || run == (NA_FLAG - 1) {
                    break;
                }
                run += 1;
                i += 1;
            }
            out.extend_from_slice(&(NA_FLAG | run).to_le_bytes());
        } else {
            if value.is_sign_negative() {
                return Err(Error::CodecViolation { detail: format!("format 4 value {value} is negative") });
            }
            out.extend_from_slice(&value.to_bits().to_le_bytes());
            i += 1;
        }
    }
    Ok(Column::new_serialized(Format::FloatBeta, rows, None, out))
}

pub fn decompress(col: Column<Serialized>) -> Result<Column<Inflated>, Error> {
    let payload = col.payload();
    if payload.len() % 4 != 0 {
        return Err(Error::CorruptAux { detail: format!("format 4 stream length {} not a multiple of 4", payload.len()) });
    }
    let mut out = Vec::new();
    for word_bytes in payload.chunks_exact(4) {
        let word = u32::from_le_bytes(word_bytes.try_into().unwrap());
        if word & NA_FLAG != 0 {
            let run = word & !NA_FLAG;
            for _ in 0..run {
                out.extend_from_slice(&NA.to_le_bytes());
            }
        } else {
            out.extend_from_slice(&f32::from_bits(word).to_le_bytes());
        }
    }
    let rows = (out.len() / 4) as u64;
    Ok(Column::new_inflated(Format::FloatBeta, rows, None, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn round_trips_mixed_na_and_values() {
        let values = vec![0.1f32, NA, NA, NA, 0.9, 0.5];
        let bytes = floats_to_bytes(&values);
        let col = Column::new_inflated(Format::FloatBeta, values.len() as u64, None, bytes.clone());
        let serialized = compress(col).unwrap();
        let back = decompress(serialized).unwrap();
        assert_eq!(back.payload(), bytes.as_slice());
    }

    #[test]
    fn rejects_negative_non_na_value() {
        let bytes = floats_to_bytes(&[-0.5]);
        let col = Column::new_inflated(Format::FloatBeta, 1, None, bytes);
        assert!(matches!(compress(col), Err(Error::CodecViolation { .. })));
    }
}
