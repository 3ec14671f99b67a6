//! DMA command construction.
//!
//! The device copies between host memory and a 4 KB buffer that lives inside
//! its own address space at [`BUFFER_OFFSET`]. Only addresses reachable with
//! [`ADDRESS_BITS`] bits can be used on the host side.

use crate::regs::dma_cmd;

/// Device-side address of the internal DMA buffer.
pub const BUFFER_OFFSET: u64 = 0x40000;

/// Size of the internal DMA buffer in bytes.
pub const BUFFER_SIZE: u64 = 4096;

/// Width of host DMA addresses accepted by the device.
pub const ADDRESS_BITS: u32 = 28;

/// Transfer direction, as seen from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaDirection {
    /// Host RAM into the device buffer.
    ToDevice,
    /// Device buffer into host RAM.
    ToRam,
}

impl DmaDirection {
    /// Direction bits for [`crate::regs::DMA_CMD`].
    #[must_use]
    pub const fn bits(self) -> u64 {
        match self {
            Self::ToDevice => dma_cmd::RAM_TO_DEV,
            Self::ToRam => dma_cmd::DEV_TO_RAM,
        }
    }
}

/// Compose a DMA command word: start bit, direction and optional completion
/// interrupt.
#[must_use]
pub const fn build_dma_command(direction: DmaDirection, raise_interrupt: bool) -> u64 {
    let mut cmd = dma_cmd::START | direction.bits();
    if raise_interrupt {
        cmd |= dma_cmd::RAISE_IRQ;
    }
    cmd
}

/// Start a host-to-device transfer and interrupt on completion.
pub const XFER_TO_DEVICE: u64 = build_dma_command(DmaDirection::ToDevice, true);

/// Start a device-to-host transfer and interrupt on completion.
pub const XFER_TO_RAM: u64 = build_dma_command(DmaDirection::ToRam, true);

/// Whether `addr` fits in the device's DMA address width.
#[must_use]
pub const fn host_address_reachable(addr: u64) -> bool {
    addr >> ADDRESS_BITS == 0
}

/// Whether `[offset, offset + count)` lies inside the device buffer window.
#[must_use]
pub const fn within_device_buffer(offset: u64, count: u64) -> bool {
    match offset.checked_add(count) {
        Some(end) => offset >= BUFFER_OFFSET && end <= BUFFER_OFFSET + BUFFER_SIZE,
        None => false,
    }
}
