//! Silicon model for the edu PCI compute device.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the device: register addresses, bit definitions, the
//! identification decode, DMA command words and PCI identifiers.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`pcie`] | Vendor/device IDs |
//! | [`bar`] | BAR layout (BAR0 1 MB register space) |
//! | [`regs`] | BAR0 register map, all offsets and bit definitions |
//! | [`ident`] | [`Version`] decode of the identification register |
//! | [`dma`] | DMA command construction and buffer window |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bar;
pub mod dma;
pub mod ident;
pub mod pcie;
pub mod regs;

pub use dma::{build_dma_command, DmaDirection};
pub use ident::Version;
