//! Control core for the edu PCI compute device.
//!
//! Issues commands through the device registers and waits for the
//! completion interrupts. Bus enumeration, interrupt allocation and any
//! user-facing surface belong to the surrounding driver; this crate only uses
//! the resources it is handed.
//!
//! # Layering
//!
//! ```text
//! Controller::compute_factorial ──▶ RegisterFile (operand, barrier, arm)
//!          │                                │
//!          ▼                                ▼ device computes
//! CompletionChannel::wait ◀── signal ◀── Controller::handle_interrupt
//! ```
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regfile`] | [`RegisterFile`] trait: typed accessors plus a device barrier |
//! | [`mmio`] | [`MappedRegion`]: a mapped BAR resource file |
//! | [`sim`] | [`SimulatedDevice`]: in-memory device with an access log |
//! | [`completion`] | [`CompletionChannel`]: single-slot arm/wait/signal |
//! | [`controller`] | [`Controller`]: probes, factorial, DMA |
//! | [`irq`] | Interrupt demultiplexer on [`Controller`] |
//! | [`config`] | [`ControllerConfig`] |
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use edu_driver::{Controller, ControllerConfig, MappedRegion};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bar = MappedRegion::for_device("0000:00:04.0")?;
//! let ctrl = Arc::new(Controller::new(bar, ControllerConfig::from_env()));
//!
//! // The surrounding driver calls this from its interrupt callback:
//! let irq_side = Arc::clone(&ctrl);
//! let _on_interrupt = move || irq_side.handle_interrupt();
//!
//! println!("edu {}", ctrl.read_version());
//! let n = ctrl.compute_factorial(5)?;
//! # let _ = n;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod completion;
pub mod config;
pub mod controller;
mod error;
pub mod irq;
pub mod mmio;
pub mod regfile;
pub mod sim;

/// Register map and device constants (re-exported from edu-chip).
pub use edu_chip as chip;

pub use completion::{Armed, CompletionChannel, SlotState};
pub use config::{ControllerConfig, DispatchMode};
pub use controller::Controller;
pub use edu_chip::{DmaDirection, Version};
pub use error::{EduError, Result};
pub use irq::InterruptReport;
pub use mmio::MappedRegion;
pub use regfile::RegisterFile;
pub use sim::{Access, SimulatedDevice};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Controller, ControllerConfig, DispatchMode, EduError, InterruptReport, MappedRegion,
        RegisterFile, Result, SimulatedDevice, Version,
    };
}
