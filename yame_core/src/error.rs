//! The error taxonomy, one variant per row of the failure-semantics table.
//!
//! `PrecisionLoss` is deliberately absent: it is silent by design,
//! observable only through a changed value, never through a `Result::Err`.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Record header magic didn't match `record::SIGNATURE`.
    SignatureMismatch { found: u64 },
    /// Stream ended in the middle of a header field or a payload.
    ShortRead { context: &'static str, want: usize, got: usize },
    /// A format tag byte isn't one of `'0'..'7'`, or a code path doesn't
    /// support the format it was handed.
    UnsupportedFormat { fmt: u8, context: &'static str },
    /// Two columns disagree on row count where the caller requires equality.
    ShapeMismatch { left: u64, right: u64 },
    /// Format-2 data references a key index that doesn't exist.
    CorruptAux { detail: String },
    /// Slicing/re-compressing a column whose typestate forbids the operation.
    CodecViolation { detail: String },
    /// The main file or an (optional) index file couldn't be opened.
    ResourceOpen { path: String, source: std::io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SignatureMismatch { found } => write!(
                f,
                "bad record signature: expected {}, found {}",
                crate::record::SIGNATURE,
                found
            ),
            Error::ShortRead { context, want, got } => write!(
                f,
                "short read while reading {context}: wanted {want} bytes, got {got}"
            ),
            Error::UnsupportedFormat { fmt, context } => write!(
                f,
                "format '{}' (0x{:02x}) unsupported in {context}",
                *fmt as char, fmt
            ),
            Error::ShapeMismatch { left, right } => {
                write!(f, "shape mismatch: {left} rows vs {right} rows")
            }
            Error::CorruptAux { detail } => write!(f, "corrupt auxiliary state: {detail}"),
            Error::CodecViolation { detail } => write!(f, "codec violation: {detail}"),
            Error::ResourceOpen { path, source } => {
                write!(f, "could not open {path}: {source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResourceOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}
