//! PCI BAR layout for the edu device.
//!
//! ```text
//! BAR  Size   Type                  Purpose
//! ──── ────── ───────────────────── ────────────────────────────────
//!  0   1 MB   32-bit non-prefetch   Register space (MMIO)
//! ```

use crate::regs::REGISTER_SPAN;

/// BAR0: register space.
pub mod bar0 {
    /// Size in bytes.
    pub const SIZE: u64 = 1024 * 1024;
    /// BAR index, also the suffix of the sysfs `resourceN` file.
    pub const INDEX: usize = 0;
}

/// Whether a mapping of `len` bytes can host every register.
#[must_use]
pub const fn covers_registers(len: usize) -> bool {
    len >= REGISTER_SPAN
}
