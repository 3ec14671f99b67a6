//! Device controller
//!
//! One [`Controller`] per physical device. It owns the register file binding
//! and the completion channels, and exposes the command operations. The
//! interrupt side lives in [`crate::irq`].
//!
//! # Collaborator contract
//!
//! The surrounding driver provides a register file that stays mapped for the
//! controller's lifetime, wires the device interrupt to
//! [`Controller::handle_interrupt`], and disables that interrupt before
//! dropping the controller. The controller itself never maps memory or
//! registers interrupt handlers.
//!
//! # Factorial protocol
//!
//! ```text
//! arm channel ─▶ write FACTORIAL ─▶ barrier ─▶ write STATUS=RAISE_IRQ ─▶ wait
//!                                                                        │
//!            read FACTORIAL ◀── woken by handle_interrupt(FACTORIAL) ◀───┘
//! ```

use crate::completion::CompletionChannel;
use crate::config::ControllerConfig;
use crate::error::{EduError, Result};
use crate::regfile::RegisterFile;
use edu_chip::dma::{self, build_dma_command, DmaDirection};
use edu_chip::regs::{self, dma_cmd, status};
use edu_chip::Version;
use tracing::{debug, info};

/// Control core for one edu device
///
/// Share it between the command context and the interrupt context with an
/// `Arc`; every operation takes `&self`.
#[derive(Debug)]
pub struct Controller<R: RegisterFile> {
    pub(crate) regs: R,
    pub(crate) factorial: CompletionChannel,
    pub(crate) dma: CompletionChannel,
    pub(crate) config: ControllerConfig,
}

impl<R: RegisterFile> Controller<R> {
    /// Bind a controller to a register file
    ///
    /// Channels are ready on return, so the collaborator may enable the
    /// device interrupt right after this.
    pub fn new(regs: R, config: ControllerConfig) -> Self {
        info!(
            "edu controller ready: timeout={:?}, dispatch={:?}",
            config.command_timeout, config.dispatch
        );
        Self {
            regs,
            factorial: CompletionChannel::new("factorial"),
            dma: CompletionChannel::new("dma"),
            config,
        }
    }

    /// Register file in use
    pub const fn registers(&self) -> &R {
        &self.regs
    }

    /// Active configuration
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Factorial completion channel
    pub const fn factorial_channel(&self) -> &CompletionChannel {
        &self.factorial
    }

    /// DMA completion channel
    pub const fn dma_channel(&self) -> &CompletionChannel {
        &self.dma
    }

    // ── Probes ───────────────────────────────────────────────────────────────

    /// Write `value` to the liveness register and read it back
    ///
    /// What the device does to the echoed value is hardware-defined; the
    /// caller gets whatever the read returns.
    pub fn probe_liveness(&self, value: u32) -> u32 {
        self.regs.write32(regs::LIVENESS, value);
        self.regs.barrier();
        let echoed = self.regs.read32(regs::LIVENESS);
        debug!("liveness {value:#x} -> {echoed:#x}");
        echoed
    }

    /// Read and decode the identification register
    pub fn read_version(&self) -> Version {
        Version::from_ident(self.regs.read32(regs::IDENT))
    }

    /// Whether the factorial unit reports itself busy
    pub fn is_computing(&self) -> bool {
        self.regs.read32(regs::STATUS) & status::COMPUTING != 0
    }

    /// Whether a DMA transfer is still running
    pub fn is_transfer_active(&self) -> bool {
        self.regs.read64(regs::DMA_CMD) & dma_cmd::START != 0
    }

    // ── Interrupt registers ──────────────────────────────────────────────────

    /// Raw interrupt status
    pub fn interrupt_status(&self) -> u32 {
        self.regs.read32(regs::IRQ_STATUS)
    }

    /// Make the device raise an interrupt with the given cause bits
    pub fn raise_interrupt(&self, causes: u32) {
        debug!("raising interrupt {causes:#x}");
        self.regs.write32(regs::IRQ_RAISE, causes);
    }

    /// Clear the given cause bits at the device
    pub fn ack_interrupt(&self, causes: u32) {
        self.regs.write32(regs::IRQ_ACK, causes);
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Compute `operand!` on the device
    ///
    /// Blocks until the completion interrupt arrives or the configured
    /// timeout expires. On 32-bit overflow the device result wraps.
    ///
    /// # Errors
    ///
    /// - [`EduError::Busy`] if another factorial is in flight on this
    ///   controller, or the device is still computing for a call that timed
    ///   out; nothing is written to the device.
    /// - [`EduError::Timeout`] if the device never interrupts. The device may
    ///   still finish later; that completion is then reported as spurious.
    pub fn compute_factorial(&self, operand: u32) -> Result<u32> {
        let ticket = self.factorial.arm()?;

        // The device drops operands while busy, and its pending interrupt
        // would complete this ticket with the stale result
        if self.is_computing() {
            debug!("factorial({operand}) rejected: device still computing");
            return Err(EduError::busy(self.factorial.name()));
        }

        self.regs.write32(regs::FACTORIAL, operand);
        self.regs.barrier();
        self.regs.write32(regs::STATUS, status::RAISE_IRQ);
        debug!("factorial({operand}) armed, waiting for interrupt");

        ticket.wait(self.config.command_timeout)?;

        let result = self.regs.read32(regs::FACTORIAL);
        debug!("factorial({operand}) = {result}");
        Ok(result)
    }

    /// Program the DMA registers and start the transfer
    ///
    /// Writes source, destination and length, then a barrier, then the
    /// command word, so the device never sees `START` before the descriptor.
    /// Does not wait; see [`Controller::transfer_dma`].
    pub fn arm_dma(&self, src: u64, dst: u64, count: u64, command: u64) {
        self.regs.write64(regs::DMA_SRC, src);
        self.regs.write64(regs::DMA_DST, dst);
        self.regs.write64(regs::DMA_COUNT, count);
        self.regs.barrier();
        self.regs.write64(regs::DMA_CMD, command);
        debug!("dma armed: {src:#x} -> {dst:#x}, {count} bytes, cmd={command:#x}");
    }

    /// Run one DMA transfer and wait for its completion interrupt
    ///
    /// For [`DmaDirection::ToDevice`] `dst` is inside the device buffer and
    /// `src` is a host bus address; for [`DmaDirection::ToRam`] the reverse.
    ///
    /// # Errors
    ///
    /// - [`EduError::InvalidTransfer`] if the device-side range is outside the
    ///   buffer window or the host address is wider than the device can reach.
    /// - [`EduError::Busy`] if a transfer is already in flight, including one
    ///   left running by a call that timed out.
    /// - [`EduError::Timeout`] if the device never interrupts.
    pub fn transfer_dma(&self, src: u64, dst: u64, count: u64, direction: DmaDirection) -> Result<()> {
        let (host, device) = match direction {
            DmaDirection::ToDevice => (src, dst),
            DmaDirection::ToRam => (dst, src),
        };
        if !dma::within_device_buffer(device, count) {
            return Err(EduError::invalid_transfer(format!(
                "device range {device:#x}+{count:#x} outside buffer window"
            )));
        }
        if !dma::host_address_reachable(host) {
            return Err(EduError::invalid_transfer(format!(
                "host address {host:#x} exceeds {} bits",
                dma::ADDRESS_BITS
            )));
        }

        let ticket = self.dma.arm()?;
        if self.is_transfer_active() {
            debug!("dma transfer rejected: previous transfer still running");
            return Err(EduError::busy(self.dma.name()));
        }
        self.arm_dma(src, dst, count, build_dma_command(direction, true));
        ticket.wait(self.config.command_timeout)
    }
}
