//! Record framing: the 17-byte header fixed in front of every column.
//!
//! `signature(8) | fmt(1) | n(8)`, little-endian. `n`'s meaning is
//! format-dependent (see [`nbytes`]): for formats `0` and `6` it is the
//! logical row count; for every other format it is the exact byte length of
//! the payload that follows.

use crate::error::Error;
use crate::format::Format;
use std::io::Read;

/// Magic constant shared by the legacy `CGSIG` and current `CDSIG` constants
/// in the source, which are numerically identical (see Open Question 5).
pub const SIGNATURE: u64 = 266_563_789_635;

pub const HEADER_SIZE: usize = 17;

/// Bytes of payload that follow a header whose format is `fmt` and whose
/// header `n` field is `n`.
///
/// Uses the corrected ceiling form for format 0 (Open Question 1): the
/// source has `(n>>3)+1` in one place and `(n+7)>>3` in another; this is the
/// latter, adopted consistently.
pub fn nbytes(fmt: Format, n: u64) -> u64 {
    match fmt {
        Format::Bit => (n + 7) >> 3,
        Format::SetUniverse => (n + 3) >> 2,
        _ => n,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub fmt: Format,
    pub n: u64,
}

impl RecordHeader {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&SIGNATURE.to_le_bytes());
        buf[8] = self.fmt.as_u8();
        buf[9..17].copy_from_slice(&self.n.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, Error> {
        let signature = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        if signature != SIGNATURE {
            return Err(Error::SignatureMismatch { found: signature });
        }
        let fmt = Format::from_u8(buf[8])
            .ok_or(Error::UnsupportedFormat { fmt: buf[8], context: "record header" })?;
        let n = u64::from_le_bytes(buf[9..17].try_into().unwrap());
        Ok(RecordHeader { fmt, n })
    }

    /// Reads one header from `r`. Returns `Ok(None)` only when the stream
    /// ended cleanly before any byte of the signature was read (graceful
    /// EOF); any other short read is fatal.
    pub fn read_from(r: &mut impl Read) -> Result<Option<Self>, Error> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut filled = 0usize;
        loop {
            match r.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
            if filled == HEADER_SIZE {
                break;
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled != HEADER_SIZE {
            return Err(Error::ShortRead {
                context: "record header",
                want: HEADER_SIZE,
                got: filled,
            });
        }
        Ok(Some(Self::from_bytes(&buf)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let h = RecordHeader { fmt: Format::SequencingCounts, n: 17 };
        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let h2 = RecordHeader::from_bytes(&bytes).unwrap();
        assert_eq!(h, h2);
    }

    #[test]
    fn bad_signature_is_fatal() {
        let mut bytes = RecordHeader { fmt: Format::Bit, n: 1 }.to_bytes();
        bytes[0] ^= 0xff;
        let err = RecordHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch { .. }));
    }

    #[test]
    fn nbytes_fmt0_ceiling() {
        assert_eq!(nbytes(Format::Bit, 0), 0);
        assert_eq!(nbytes(Format::Bit, 1), 1);
        assert_eq!(nbytes(Format::Bit, 8), 1);
        assert_eq!(nbytes(Format::Bit, 9), 2);
    }

    #[test]
    fn nbytes_fmt6_ceiling() {
        assert_eq!(nbytes(Format::SetUniverse, 0), 0);
        assert_eq!(nbytes(Format::SetUniverse, 1), 1);
        assert_eq!(nbytes(Format::SetUniverse, 4), 1);
        assert_eq!(nbytes(Format::SetUniverse, 5), 2);
    }

    #[test]
    fn nbytes_other_formats_is_n() {
        assert_eq!(nbytes(Format::Rle, 123), 123);
        assert_eq!(nbytes(Format::Coordinates, 9001), 9001);
    }
}
