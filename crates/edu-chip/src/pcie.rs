//! PCI identifiers.

/// QEMU vendor ID used by the edu device.
pub const EDU_VENDOR_ID: u16 = 0x1234;

/// edu device ID (`lspci: 1234:11e8`).
pub const EDU_DEVICE_ID: u16 = 0x11E8;

/// Human-readable device description.
pub const EDU_DEVICE_DESC: &str = "Edu device";

/// Format a `vendor:device` string for use with `lspci -d`.
#[must_use]
pub fn lspci_filter() -> String {
    format!("{EDU_VENDOR_ID:04x}:{EDU_DEVICE_ID:04x}")
}

/// Whether a vendor/device pair identifies an edu device.
#[must_use]
pub const fn is_edu(vendor: u16, device: u16) -> bool {
    vendor == EDU_VENDOR_ID && device == EDU_DEVICE_ID
}
