//! Error types for edu driver operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for edu operations
pub type Result<T> = std::result::Result<T, EduError>;

/// Errors that can occur during edu operations
///
/// None of these are fatal to the controller; each is local to a single
/// command attempt or a single mapping attempt.
#[derive(Debug, Error)]
pub enum EduError {
    /// The device never signalled completion
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// A command is already outstanding on this channel
    #[error("Device busy: {command} already in flight")]
    Busy {
        /// Command that was rejected
        command: &'static str,
    },

    /// Interrupt status carried causes that no channel handles
    #[error("Malformed interrupt status {status:#x}")]
    MalformedInterrupt {
        /// Raw interrupt status snapshot
        status: u32,
    },

    /// Invalid DMA descriptor
    #[error("Invalid DMA transfer: {reason}")]
    InvalidTransfer {
        /// Reason for rejection
        reason: String,
    },

    /// Resource file not found at the expected path
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// The PCI function at the given address is not an edu device
    #[error(
        "Unexpected device {vendor:04x}:{device:04x}, expected {} ({})",
        edu_chip::pcie::EDU_DEVICE_DESC,
        edu_chip::pcie::lspci_filter()
    )]
    UnexpectedDevice {
        /// PCI vendor ID read from sysfs
        vendor: u16,
        /// PCI device ID read from sysfs
        device: u16,
    },

    /// Mapping the register BAR failed
    #[error("Failed to map registers: {reason}")]
    MapFailed {
        /// Reason for failure
        reason: String,
    },

    /// I/O error during device setup
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl EduError {
    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a busy error
    pub const fn busy(command: &'static str) -> Self {
        Self::Busy { command }
    }

    /// Create an invalid transfer error
    pub fn invalid_transfer(reason: impl Into<String>) -> Self {
        Self::InvalidTransfer {
            reason: reason.into(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create a map failed error
    pub fn map_failed(reason: impl Into<String>) -> Self {
        Self::MapFailed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same command later can succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Busy { .. })
    }
}
