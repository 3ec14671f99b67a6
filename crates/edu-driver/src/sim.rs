//! Simulated edu device
//!
//! An in-memory [`RegisterFile`] that behaves like QEMU's edu device closely
//! enough to drive the controller without hardware:
//!
//! - identification reads `0x010000ed`
//! - liveness reads back the bitwise inverse of the last write
//! - writing the factorial register sets `COMPUTING`
//! - [`SimulatedDevice::complete_factorial`] stores `n!` and raises the
//!   factorial interrupt cause if the status register asked for it
//! - `IRQ_RAISE` sets cause bits, `IRQ_ACK` clears them
//! - a DMA command with `START` is latched until
//!   [`SimulatedDevice::complete_dma`]
//!
//! The device does not call back into a controller. A test harness plays the
//! interrupt line: it waits for [`SimulatedDevice::wait_until_armed`], completes
//! the operation and then invokes the demultiplexer. Every access is recorded
//! so tests can check protocol ordering.

use crate::regfile::{check_access, RegisterFile};
use edu_chip::ident::QEMU_EDU_IDENT;
use edu_chip::regs::{self, dma_cmd, irq, status};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One register access as seen by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// 32-bit read and the value returned
    Read32 {
        /// Register offset
        offset: usize,
        /// Value returned
        value: u32,
    },
    /// 32-bit write
    Write32 {
        /// Register offset
        offset: usize,
        /// Value written
        value: u32,
    },
    /// 64-bit read and the value returned
    Read64 {
        /// Register offset
        offset: usize,
        /// Value returned
        value: u64,
    },
    /// 64-bit write
    Write64 {
        /// Register offset
        offset: usize,
        /// Value written
        value: u64,
    },
    /// Ordering barrier
    Barrier,
}

impl Access {
    /// Register offset touched, `None` for a barrier
    pub const fn offset(&self) -> Option<usize> {
        match *self {
            Self::Read32 { offset, .. }
            | Self::Write32 { offset, .. }
            | Self::Read64 { offset, .. }
            | Self::Write64 { offset, .. } => Some(offset),
            Self::Barrier => None,
        }
    }

    /// Whether this is a read of `offset`
    pub const fn is_read_of(&self, offset: usize) -> bool {
        match *self {
            Self::Read32 { offset: o, .. } | Self::Read64 { offset: o, .. } => o == offset,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Registers {
    ident: u32,
    liveness: u32,
    factorial: u32,
    status: u32,
    irq_status: u32,
    dma_src: u64,
    dma_dst: u64,
    dma_count: u64,
    dma_cmd: u64,
    log: Vec<Access>,
}

impl Registers {
    const fn new(ident: u32) -> Self {
        Self {
            ident,
            liveness: 0,
            factorial: 0,
            status: 0,
            irq_status: 0,
            dma_src: 0,
            dma_dst: 0,
            dma_count: 0,
            dma_cmd: 0,
            log: Vec::new(),
        }
    }

    fn factorial_armed(&self) -> bool {
        self.status & status::RAISE_IRQ != 0 && self.status & status::COMPUTING != 0
    }

    fn dma_armed(&self) -> bool {
        self.dma_cmd & dma_cmd::START != 0
    }
}

/// In-memory edu device
#[derive(Debug)]
pub struct SimulatedDevice {
    regs: Mutex<Registers>,
    armed: Condvar,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// Create a device reporting QEMU's identification value
    pub fn new() -> Self {
        Self::with_ident(QEMU_EDU_IDENT)
    }

    /// Create a device reporting a custom identification value
    pub fn with_ident(ident: u32) -> Self {
        Self {
            regs: Mutex::new(Registers::new(ident)),
            armed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registers> {
        // Register state stays consistent even if a test thread panicked
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Finish the pending factorial computation
    ///
    /// Stores `n!` (wrapping on overflow) in the factorial register and clears
    /// `COMPUTING`. Returns `true` if the device would now raise an interrupt,
    /// in which case the factorial cause is set in `IRQ_STATUS`.
    pub fn complete_factorial(&self) -> bool {
        let mut regs = self.lock();
        let n = regs.factorial;
        regs.factorial = (1..=n).fold(1u32, u32::wrapping_mul);
        regs.status &= !status::COMPUTING;
        let raise = regs.status & status::RAISE_IRQ != 0;
        if raise {
            regs.irq_status |= irq::FACTORIAL;
        }
        tracing::trace!("sim: {n}! = {:#x}, irq={raise}", regs.factorial);
        raise
    }

    /// Finish the latched DMA transfer
    ///
    /// Clears `START`. Returns `true` (and sets the DMA cause) if the command
    /// asked for a completion interrupt. Data is not moved.
    pub fn complete_dma(&self) -> bool {
        let mut regs = self.lock();
        let raise = regs.dma_cmd & dma_cmd::RAISE_IRQ != 0;
        regs.dma_cmd &= !dma_cmd::START;
        if raise {
            regs.irq_status |= irq::DMA;
        }
        raise
    }

    /// Block until a factorial computation or DMA transfer is armed
    ///
    /// Returns `false` on timeout.
    pub fn wait_until_armed(&self, timeout: Duration) -> bool {
        let regs = self.lock();
        let (regs, result) = self
            .armed
            .wait_timeout_while(regs, timeout, |r| !r.factorial_armed() && !r.dma_armed())
            .unwrap_or_else(PoisonError::into_inner);
        drop(regs);
        !result.timed_out()
    }

    /// Overwrite the factorial register, as if the device had produced `value`
    pub fn set_factorial(&self, value: u32) {
        self.lock().factorial = value;
    }

    /// Overwrite the interrupt status, as if the device had raised `causes`
    pub fn set_irq_status(&self, causes: u32) {
        self.lock().irq_status = causes;
    }

    /// Current interrupt status, without recording an access
    pub fn irq_status(&self) -> u32 {
        self.lock().irq_status
    }

    /// Drain the access log
    pub fn take_log(&self) -> Vec<Access> {
        std::mem::take(&mut self.lock().log)
    }

    /// Values written to `offset` so far, oldest first, without draining
    pub fn writes_to(&self, offset: usize) -> Vec<u64> {
        self.lock()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write32 { offset: o, value } if o == offset => Some(u64::from(value)),
                Access::Write64 { offset: o, value } if o == offset => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl RegisterFile for SimulatedDevice {
    fn read32(&self, offset: usize) -> u32 {
        check_access(offset, 4, regs::REGISTER_SPAN);
        let mut r = self.lock();
        let value = match offset {
            regs::IDENT => r.ident,
            regs::LIVENESS => !r.liveness,
            regs::FACTORIAL => r.factorial,
            regs::STATUS => r.status,
            regs::IRQ_STATUS => r.irq_status,
            _ => 0,
        };
        r.log.push(Access::Read32 { offset, value });
        value
    }

    fn write32(&self, offset: usize, value: u32) {
        check_access(offset, 4, regs::REGISTER_SPAN);
        let mut r = self.lock();
        r.log.push(Access::Write32 { offset, value });
        match offset {
            regs::LIVENESS => r.liveness = value,
            regs::FACTORIAL => {
                // The device ignores operands while busy
                if r.status & status::COMPUTING == 0 {
                    r.factorial = value;
                    r.status |= status::COMPUTING;
                }
            }
            regs::STATUS => {
                r.status = (r.status & status::COMPUTING) | (value & status::RAISE_IRQ);
            }
            regs::IRQ_RAISE => r.irq_status |= value,
            regs::IRQ_ACK => r.irq_status &= !value,
            _ => {}
        }
        if r.factorial_armed() {
            self.armed.notify_all();
        }
    }

    fn read64(&self, offset: usize) -> u64 {
        check_access(offset, 8, regs::REGISTER_SPAN);
        let mut r = self.lock();
        let value = match offset {
            regs::DMA_SRC => r.dma_src,
            regs::DMA_DST => r.dma_dst,
            regs::DMA_COUNT => r.dma_count,
            regs::DMA_CMD => r.dma_cmd,
            _ => 0,
        };
        r.log.push(Access::Read64 { offset, value });
        value
    }

    fn write64(&self, offset: usize, value: u64) {
        check_access(offset, 8, regs::REGISTER_SPAN);
        let mut r = self.lock();
        r.log.push(Access::Write64 { offset, value });
        match offset {
            regs::DMA_SRC => r.dma_src = value,
            regs::DMA_DST => r.dma_dst = value,
            regs::DMA_COUNT => r.dma_count = value,
            regs::DMA_CMD => r.dma_cmd = value,
            _ => {}
        }
        if r.dma_armed() {
            self.armed.notify_all();
        }
    }

    fn barrier(&self) {
        self.lock().log.push(Access::Barrier);
    }
}
