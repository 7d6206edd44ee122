//! The `Column` typestate: a column is either `Inflated` (one logical value
//! per row, fixed or computable width) or `Serialized` (whatever compact
//! on-disk byte stream its format defines). Crossing between the two states
//! is only possible through a format's `compress`/`decompress` pair in
//! `yame_formats`, never by mutating a column in place — mirroring the
//! source's `cdata_t` minus its "compressed is just a bool flag" weakness.

use crate::format::Format;
use crate::unit::Unit;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Inflated {}
    impl Sealed for super::Serialized {}
}

pub trait ColumnState: sealed::Sealed {}

/// One logical value per row, in the format's raw (uncompressed) layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflated;
impl ColumnState for Inflated {}

/// The format's on-disk / wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Serialized;
impl ColumnState for Serialized {}

/// One sample's values over all rows, in one format, in one typestate.
///
/// `rows` is always the logical row count (the Data Model's "`n` counts
/// logical rows" invariant) *except* on a `Column<Serialized>` for formats
/// other than 0 and 6, where it is whatever the record header's `n` field
/// holds on disk — the compressed payload's *byte length*, not a row count
/// (the framing exception carried from format 1, generalized to every
/// variable-width format); see [`Column::rows`]'s doc.
#[derive(Debug, Clone)]
pub struct Column<S: ColumnState = Serialized> {
    fmt: Format,
    rows: u64,
    unit: Option<Unit>,
    payload: Vec<u8>,
    _state: PhantomData<S>,
}

impl<S: ColumnState> Column<S> {
    pub fn fmt(&self) -> Format {
        self.fmt
    }

    /// The record header's `n` field, as stored. For `Column<Inflated>` this
    /// is always the exact logical row count. For `Column<Serialized>`
    /// formats 0 and 6 it is also the exact row count (the header `n` field
    /// literally is the row count for those two). For every other serialized
    /// format — 1, 2, 3, 4, 5, 7 — it is the compressed payload's *byte
    /// length* (§4.1's framing exception), not a row count: a freshly read
    /// record has not been walked yet, so the true row count isn't known
    /// until the format's `decompress` (or, for format 7, `fmt7::row_count`)
    /// has run. Callers that need the logical row count from a serialized
    /// column of those formats must decompress first; don't read `rows()`
    /// on it expecting a row count.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl Column<Inflated> {
    /// Constructs an inflated column. Format modules are trusted to pass a
    /// `payload` whose length matches `rows` under that format's inflated
    /// layout (e.g. `rows` bytes for format 1, `rows * unit` bytes for
    /// format 3).
    pub fn new_inflated(fmt: Format, rows: u64, unit: Option<Unit>, payload: Vec<u8>) -> Self {
        Column { fmt, rows, unit, payload, _state: PhantomData }
    }

    /// In-place byte access, available only on inflated columns: accessors
    /// like format 6's `set_0`/`set_1`/`set_na` flip bits within an existing
    /// row rather than rebuilding the payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }
}

impl Column<Serialized> {
    /// Constructs a serialized column. `rows` follows the same
    /// format-dependent meaning documented on [`Column::rows`].
    pub fn new_serialized(fmt: Format, rows: u64, unit: Option<Unit>, payload: Vec<u8>) -> Self {
        Column { fmt, rows, unit, payload, _state: PhantomData }
    }

    /// The value that belongs in a record header's `n` field for this
    /// column: row count for formats 0/6, payload byte length for every
    /// other format.
    pub fn header_n(&self) -> u64 {
        match self.fmt {
            Format::Bit | Format::SetUniverse => self.rows,
            _ => self.payload.len() as u64,
        }
    }
}
