//! Variable-width packed unit, used by formats 2 and 3.
//!
//! Modeled as an enum `{U1, U2, U3, U8}` so accessors dispatch directly on
//! it, instead of branching on a raw byte width at every access site.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    U1 = 1,
    U2 = 2,
    U3 = 3,
    U8 = 8,
}

impl Unit {
    pub fn bytes(self) -> usize {
        self as usize
    }

    pub fn from_byte_width(w: u8) -> Option<Self> {
        match w {
            1 => Some(Unit::U1),
            2 => Some(Unit::U2),
            3 => Some(Unit::U3),
            8 => Some(Unit::U8),
            _ => None,
        }
    }

    /// The minimal unit able to losslessly hold `max_value` as an unsigned
    /// integer (format 2's categorical key index, or similar).
    pub fn minimal_for_max_value(max_value: u64) -> Self {
        if max_value < (1 << 8) {
            Unit::U1
        } else if max_value < (1 << 16) {
            Unit::U2
        } else if max_value < (1 << 24) {
            Unit::U3
        } else {
            Unit::U8
        }
    }

    /// The minimal unit whose half-width (`4 * bytes()` bits) can hold both
    /// `m` and `u` without narrowing (format 3's per-row MU pair).
    pub fn minimal_for_mu(m: u64, u: u64) -> Self {
        for candidate in [Unit::U1, Unit::U2, Unit::U3, Unit::U8] {
            let bits = 4 * candidate.bytes() as u32;
            let max = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
            if m <= max && u <= max {
                return candidate;
            }
        }
        Unit::U8
    }
}
