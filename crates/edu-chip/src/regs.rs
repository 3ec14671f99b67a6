//! BAR0 register map for the edu device.
//!
//! Offsets and bit values are the device ABI. They are fixed by the hardware
//! and must never be computed at runtime.
//!
//! ```text
//! 0x00  ident        RO  0xRRrr00ed  (RR = major, rr = minor)
//! 0x04  liveness     RW  reads back the bitwise inverse of the last write
//! 0x08  factorial    RW  operand in, n! out
//! 0x20  status       RW  bit 0 computing, bit 7 raise IRQ on completion
//! 0x24  irq_status   RO  pending interrupt causes
//! 0x60  irq_raise    WO  sets bits in irq_status
//! 0x64  irq_ack      WO  clears bits in irq_status
//! 0x80  dma_src      RW  64-bit
//! 0x88  dma_dst      RW  64-bit
//! 0x90  dma_count    RW  64-bit
//! 0x98  dma_cmd      RW  64-bit
//! ```

// ── Identity and liveness ────────────────────────────────────────────────────

/// Identification register (major/minor in the two high bytes).
pub const IDENT: usize = 0x00;

/// Liveness check register.
pub const LIVENESS: usize = 0x04;

// ── Factorial computation ────────────────────────────────────────────────────

/// Factorial operand on write, result on read.
pub const FACTORIAL: usize = 0x08;

/// Status register. Writing it arms the factorial unit.
pub const STATUS: usize = 0x20;

// ── Interrupts ───────────────────────────────────────────────────────────────

/// Interrupt status register.
pub const IRQ_STATUS: usize = 0x24;
/// Interrupt raise register.
pub const IRQ_RAISE: usize = 0x60;
/// Interrupt acknowledge register. Written bits are cleared in `IRQ_STATUS`.
pub const IRQ_ACK: usize = 0x64;

// ── DMA engine ───────────────────────────────────────────────────────────────

/// DMA source address.
pub const DMA_SRC: usize = 0x80;
/// DMA destination address.
pub const DMA_DST: usize = 0x88;
/// DMA transfer length in bytes.
pub const DMA_COUNT: usize = 0x90;
/// DMA command word, see [`dma_cmd`].
pub const DMA_CMD: usize = 0x98;

/// One past the last register. Any mapping smaller than this cannot host the
/// register file.
pub const REGISTER_SPAN: usize = DMA_CMD + 8;

// ── Status register bit definitions ──────────────────────────────────────────

/// Status register bits.
pub mod status {
    /// The factorial unit is busy.
    pub const COMPUTING: u32 = 0x01;
    /// Raise [`super::irq::FACTORIAL`] when the computation finishes.
    pub const RAISE_IRQ: u32 = 0x80;
}

// ── Interrupt status bit definitions ─────────────────────────────────────────

/// Interrupt status, raise and acknowledge bits.
pub mod irq {
    /// Factorial computation finished.
    pub const FACTORIAL: u32 = 0x01;
    /// DMA transfer finished.
    pub const DMA: u32 = 0x100;
    /// Every cause the device is known to report.
    pub const KNOWN: u32 = FACTORIAL | DMA;
}

// ── DMA command bit definitions ──────────────────────────────────────────────

/// DMA command register bits.
pub mod dma_cmd {
    /// Start the transfer. Cleared by the device on completion.
    pub const START: u64 = 1;
    /// Direction: host RAM to device buffer.
    pub const RAM_TO_DEV: u64 = 0;
    /// Direction: device buffer to host RAM.
    pub const DEV_TO_RAM: u64 = 2;
    /// Raise [`super::irq::DMA`] when the transfer finishes.
    pub const RAISE_IRQ: u64 = 4;
}
