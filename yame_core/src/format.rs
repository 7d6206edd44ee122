//! The column format tag, `'0'..'7'`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Dense bit vector.
    Bit = b'0' as isize,
    /// ASCII run-length stream.
    Rle = b'1' as isize,
    /// Categorical states (key dictionary + RLE'd indices).
    Categorical = b'2' as isize,
    /// Sequencing M/U counts, variable-width packed.
    SequencingCounts = b'3' as isize,
    /// Float beta values with NA runs.
    FloatBeta = b'4' as isize,
    /// Legacy ternary {0,1,2}, retained for reading old files only.
    TernaryLegacy = b'5' as isize,
    /// Set + universe, 2 bits/row.
    SetUniverse = b'6' as isize,
    /// Genomic coordinates.
    Coordinates = b'7' as isize,
}

impl Format {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            b'0' => Some(Format::Bit),
            b'1' => Some(Format::Rle),
            b'2' => Some(Format::Categorical),
            b'3' => Some(Format::SequencingCounts),
            b'4' => Some(Format::FloatBeta),
            b'5' => Some(Format::TernaryLegacy),
            b'6' => Some(Format::SetUniverse),
            b'7' => Some(Format::Coordinates),
            _ => None,
        }
    }

    /// Formats valid for newly written files; `'5'` is read-only (legacy).
    pub fn is_writable(self) -> bool {
        !matches!(self, Format::TernaryLegacy)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8() as char)
    }
}
