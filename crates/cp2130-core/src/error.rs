//! Error types for cp2130-core
//!
//! Field and register errors are raised at the encode/decode call that hit
//! them. Transport errors come from the injected [`Transport`] and are passed
//! through untouched.
//!
//! [`Transport`]: crate::transport::Transport

use thiserror::Error;

use crate::field::FieldError;

/// Result type for CP2130 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a transport backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The device went away
    #[error("device disconnected")]
    Disconnected,

    /// The transfer did not complete in time
    #[error("transfer timed out")]
    Timeout,

    /// The endpoint stalled the request
    #[error("endpoint stalled")]
    Stall,

    /// Fewer bytes came back than were requested
    #[error("incomplete transfer: expected {expected} bytes, got {actual}")]
    Incomplete { expected: usize, actual: usize },

    /// Any other backend-specific failure
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the register codec, the dispatcher and the SPI layer
#[derive(Debug, Error)]
pub enum Error {
    /// A domain value could not be encoded (or a raw value decoded) for a field
    #[error("invalid value for field `{field}`: {source}")]
    FieldValue {
        field: &'static str,
        #[source]
        source: FieldError,
    },

    /// Raw buffer length does not match the register width
    #[error("{register}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        register: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A constant field came back with an unexpected value
    #[error("{register}.{field}: expected constant 0x{expected:02X}, device returned 0x{actual:02X}")]
    ProtocolViolation {
        register: &'static str,
        field: &'static str,
        expected: u32,
        actual: u32,
    },

    /// Failure in the transport backend
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The requested operation is not available for this configuration
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// No field with this name exists in the register
    #[error("{register} has no field named `{field}`")]
    UnknownField {
        register: &'static str,
        field: String,
    },

    /// A command was used in the wrong direction
    #[error("command {command} cannot be used for a {attempted}")]
    Direction {
        command: &'static str,
        attempted: &'static str,
    },

    /// An array or indexed command was called without an index
    #[error("command {0} requires an index")]
    MissingIndex(&'static str),

    /// Entry index beyond the end of an array command
    #[error("command {command}: index {index} out of range (0..{count})")]
    IndexOutOfRange {
        command: &'static str,
        index: u16,
        count: u16,
    },

    /// Argument rejected by a high-level helper
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
