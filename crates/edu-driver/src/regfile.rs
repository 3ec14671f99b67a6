//! Register file abstraction
//!
//! The controller never touches raw pointers. It talks to a [`RegisterFile`],
//! which may be a mapped BAR ([`crate::mmio::MappedRegion`]) or the in-memory
//! [`crate::sim::SimulatedDevice`].
//!
//! # Ordering
//!
//! Every write that makes the device change state (arming a computation,
//! starting a DMA transfer) must be preceded by [`RegisterFile::barrier`] so
//! the device never observes the trigger before the operands it depends on.

use std::sync::Arc;

/// Fixed-layout device register access
///
/// All accessors take `&self`: the register file is shared between the command
/// context and the interrupt context. Offsets come from `edu_chip::regs`;
/// an offset outside the mapping is a programming error and panics.
pub trait RegisterFile: Send + Sync {
    /// Read a 32-bit register. Reads have no side effects on this device.
    fn read32(&self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write32(&self, offset: usize, value: u32);

    /// Read a 64-bit register
    fn read64(&self, offset: usize) -> u64;

    /// Write a 64-bit register
    fn write64(&self, offset: usize, value: u64);

    /// Order every earlier access before every later one, as observed by the
    /// device
    fn barrier(&self);
}

impl<R: RegisterFile + ?Sized> RegisterFile for &R {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn read64(&self, offset: usize) -> u64 {
        (**self).read64(offset)
    }

    fn write64(&self, offset: usize, value: u64) {
        (**self).write64(offset, value);
    }

    fn barrier(&self) {
        (**self).barrier();
    }
}

impl<R: RegisterFile + ?Sized> RegisterFile for Arc<R> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn read64(&self, offset: usize) -> u64 {
        (**self).read64(offset)
    }

    fn write64(&self, offset: usize, value: u64) {
        (**self).write64(offset, value);
    }

    fn barrier(&self) {
        (**self).barrier();
    }
}

impl<R: RegisterFile + ?Sized> RegisterFile for Box<R> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn read64(&self, offset: usize) -> u64 {
        (**self).read64(offset)
    }

    fn write64(&self, offset: usize, value: u64) {
        (**self).write64(offset, value);
    }

    fn barrier(&self) {
        (**self).barrier();
    }
}

/// Panic unless a `width`-byte access at `offset` fits in `limit` bytes and is
/// naturally aligned.
///
/// # Panics
///
/// Panics on an out-of-range or misaligned offset.
#[inline]
#[track_caller]
pub(crate) fn check_access(offset: usize, width: usize, limit: usize) {
    assert!(
        offset.checked_add(width).is_some_and(|end| end <= limit),
        "Register offset out of bounds: offset={offset:#x}, size={width}, limit={limit:#x}"
    );
    assert!(
        offset % width == 0,
        "Misaligned register access: offset={offset:#x}, size={width}"
    );
}
