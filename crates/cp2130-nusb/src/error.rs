//! Error types for the USB transport

use thiserror::Error;

/// Errors raised while finding and opening a CP2130
#[derive(Debug, Error)]
pub enum UsbError {
    /// No matching device is connected
    #[error("CP2130 device not found (VID:{vid:04x} PID:{pid:04x}, index {index})")]
    DeviceNotFound { vid: u16, pid: u16, index: usize },

    /// Enumeration or open failed
    #[error("Failed to open CP2130: {0}")]
    OpenFailed(String),

    /// Failed to claim the interface or its endpoints
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// Invalid transport option
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for USB transport operations
pub type Result<T> = std::result::Result<T, UsbError>;
