//! Flag words and timestamp ordering helpers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::link_flags::{gap, sample_content, status};

/// A 16-bit flag word as carried on the link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Flags(pub u16);

impl Flags {
    pub const EMPTY: Flags = Flags(0);

    /// Create a new flag word from a raw value.
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 16 && (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of `mask` is set.
    pub fn has_flag(&self, mask: u16) -> bool {
        (self.0 & mask) != 0
    }

    /// Check if every bit of `mask` is set.
    pub fn has_all(&self, mask: u16) -> bool {
        (self.0 & mask) == mask
    }

    pub fn with(self, mask: u16) -> Self {
        Self(self.0 | mask)
    }

    pub fn without(self, mask: u16) -> Self {
        Self(self.0 & !mask)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Get the raw value.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Which classes of records were lost before a delivered item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct GapFlags(pub u16);

impl GapFlags {
    pub const NONE: GapFlags = GapFlags(0);
    pub const SAMPLE: GapFlags = GapFlags(gap::SAMPLE);
    pub const EVENT: GapFlags = GapFlags(gap::EVENT);
    pub const CONTROL: GapFlags = GapFlags(gap::CONTROL);

    pub fn samples_dropped(&self) -> bool {
        self.0 & gap::SAMPLE != 0
    }

    pub fn events_dropped(&self) -> bool {
        self.0 & gap::EVENT != 0
    }

    pub fn controls_dropped(&self) -> bool {
        self.0 & gap::CONTROL != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl BitOr for GapFlags {
    type Output = GapFlags;

    fn bitor(self, rhs: GapFlags) -> GapFlags {
        GapFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for GapFlags {
    fn bitor_assign(&mut self, rhs: GapFlags) {
        self.0 |= rhs.0;
    }
}

/// Compare tracker timestamps in u32 space with wraparound using the half-range rule.
/// Returns true if `a` is considered later than `b`.
pub fn time_after(a: u32, b: u32) -> bool {
    if a == b {
        return false;
    }
    a.wrapping_sub(b) < 0x8000_0000
}

/// Whether a sample's timestamp needs the half-millisecond offset added.
pub fn has_half_ms_offset(content: Flags) -> bool {
    content.has_flag(sample_content::ADD_OFFSET)
}

/// Whether a sample status word reports a lost corneal reflection.
pub fn corneal_reflection_lost(status_word: u16) -> bool {
    status_word & (status::CR_LOST_LEFT | status::CR_LOST_RIGHT) != 0
}

/// Whether a sample status word carries any head position warning.
pub fn head_position_warning(status_word: u16) -> bool {
    status_word & status::HPOS_ANY != 0
}
