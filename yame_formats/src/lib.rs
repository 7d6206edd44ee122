//! The eight column codecs, one module per format tag.
//! Each module exposes `compress`/`decompress` between `Column<Inflated>`
//! and `Column<Serialized>`, plus whatever per-format accessors its layout
//! needs. Format 5 is read-only (no public `compress`); format 7's shapes
//! don't fit the others' fixed-width model and gets its own slicing and
//! random-lookup helpers instead of `yame_core::slice`'s.

pub mod fmt0;
pub mod fmt1;
pub mod fmt2;
pub mod fmt3;
pub mod fmt4;
pub mod fmt5;
pub mod fmt6;
pub mod fmt7;

/// Dispatches decompression by the column's own format tag — the entry
/// point `yame_cli` and `yame_core::reader` helpers use when the format
/// isn't known ahead of time.
pub fn decompress(
    col: yame_core::column::Column<yame_core::column::Serialized>,
) -> Result<yame_core::column::Column<yame_core::column::Inflated>, yame_core::error::Error> {
    use yame_core::format::Format;
    match col.fmt() {
        Format::Bit => fmt0::decompress(col),
        Format::Rle => fmt1::decompress(col),
        Format::Categorical => fmt2::decompress(col),
        Format::SequencingCounts => fmt3::decompress(col),
        Format::FloatBeta => fmt4::decompress(col),
        Format::TernaryLegacy => fmt5::decompress(col),
        Format::SetUniverse => fmt6::decompress(col),
        Format::Coordinates => fmt7::decompress(col),
    }
}

/// Dispatches compression by the column's own format tag. Format 5 is
/// read-only and has no writer here, matching `Format::is_writable`.
pub fn compress(
    col: yame_core::column::Column<yame_core::column::Inflated>,
) -> Result<yame_core::column::Column<yame_core::column::Serialized>, yame_core::error::Error> {
    use yame_core::error::Error;
    use yame_core::format::Format;
    match col.fmt() {
        Format::Bit => Ok(fmt0::compress(col)),
        Format::Rle => Ok(fmt1::compress(col)),
        Format::Categorical => fmt2::compress(col),
        Format::SequencingCounts => fmt3::compress(col),
        Format::FloatBeta => fmt4::compress(col),
        Format::TernaryLegacy => {
            Err(Error::UnsupportedFormat { fmt: Format::TernaryLegacy.as_u8(), context: "compress" })
        }
        Format::SetUniverse => fmt6::compress(col),
        Format::Coordinates => fmt7::compress(col),
    }
}
