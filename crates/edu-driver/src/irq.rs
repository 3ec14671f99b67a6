//! Interrupt demultiplexer
//!
//! Runs in the interrupt context: one status read, route each cause to its
//! completion channel, acknowledge exactly the bits that were read. No
//! allocation and no blocking beyond the channels' short locks.

use crate::config::DispatchMode;
use crate::controller::Controller;
use crate::error::EduError;
use crate::regfile::RegisterFile;
use edu_chip::regs::{self, irq};
use tracing::{debug, warn};

/// What one interrupt delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptReport {
    /// Status snapshot, also the value written to `IRQ_ACK`
    pub status: u32,
    /// The factorial channel had a waiter and was completed
    pub factorial_signaled: bool,
    /// The DMA channel had a waiter and was completed
    pub dma_signaled: bool,
    /// Bits of `status` that no channel handled
    pub unhandled: u32,
}

impl InterruptReport {
    /// Nothing was pending (shared line, or already acknowledged)
    pub const fn is_empty(&self) -> bool {
        self.status == 0
    }

    /// The snapshot carried bits that no channel handled
    pub const fn is_malformed(&self) -> bool {
        self.unhandled != 0
    }

    /// The condition to report for unhandled bits, if any
    pub fn error(&self) -> Option<EduError> {
        if self.is_malformed() {
            Some(EduError::MalformedInterrupt { status: self.status })
        } else {
            None
        }
    }
}

/// Which channels a status snapshot routes to under `mode`
///
/// Returns `(factorial, dma, unhandled_bits)`.
pub const fn route(status: u32, mode: DispatchMode) -> (bool, bool, u32) {
    match mode {
        DispatchMode::PerBit => (
            status & irq::FACTORIAL != 0,
            status & irq::DMA != 0,
            status & !irq::KNOWN,
        ),
        DispatchMode::ExactMatch => match status {
            irq::FACTORIAL => (true, false, 0),
            irq::DMA => (false, true, 0),
            0 => (false, false, 0),
            other => (false, false, other),
        },
    }
}

impl<R: RegisterFile> Controller<R> {
    /// Service one device interrupt
    ///
    /// Call this from the interrupt callback the collaborator registered.
    /// The acknowledgment is written whether or not any cause was routed, so
    /// bits that are not routed are cleared at the device without completing
    /// anything.
    pub fn handle_interrupt(&self) -> InterruptReport {
        let status = self.regs.read32(regs::IRQ_STATUS);
        let verbose = self.config.verbose();
        if verbose {
            debug!("interrupt status {status:#x}");
        }

        let (to_factorial, to_dma, unhandled) = route(status, self.config.dispatch);
        let mut report = InterruptReport {
            status,
            unhandled,
            ..InterruptReport::default()
        };

        if to_factorial {
            if verbose {
                debug!("factorial result ready");
            }
            report.factorial_signaled = self.factorial.signal();
            if !report.factorial_signaled {
                warn!("spurious factorial completion (no command outstanding)");
            }
        }

        if to_dma {
            if verbose {
                debug!("dma transfer finished");
            }
            report.dma_signaled = self.dma.signal();
            if !report.dma_signaled {
                warn!("spurious dma completion (no transfer outstanding)");
            }
        }

        if let Some(err) = report.error() {
            warn!("{err}: unhandled bits {unhandled:#x} acknowledged");
        }

        self.regs.write32(regs::IRQ_ACK, status);
        report
    }
}
