//! Identification register decode.

use core::fmt;

/// Identity value reported by QEMU's edu device (version 1.0).
pub const QEMU_EDU_IDENT: u32 = 0x0100_00ed;

/// Hardware revision, decoded from the two high bytes of [`crate::regs::IDENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    /// Major revision (bits 31..24).
    pub major: u8,
    /// Minor revision (bits 23..16).
    pub minor: u8,
}

impl Version {
    /// Decode a raw identification register value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_ident(ident: u32) -> Self {
        Self {
            major: ((ident >> 24) & 0xFF) as u8,
            minor: ((ident >> 16) & 0xFF) as u8,
        }
    }
}

impl From<u32> for Version {
    fn from(ident: u32) -> Self {
        Self::from_ident(ident)
    }
}

/// Renders as `major:minor`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}
