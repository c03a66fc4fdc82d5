//! Transport layer for the gauge controller link
//!
//! Supports:
//! - Serial ports (RS-232, USB-Serial adapters)
//! - Scripted byte streams for tests and offline diagnostics
//!
//! The wire-level device emulator lives in [`crate::core::simulator::VirtualDevice`]
//! and implements the same trait.

mod scripted;
mod serial;

pub use scripted::ScriptedTransport;
pub use serial::{
    list_ports, SerialConfig, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS,
    SUPPORTED_BAUD_RATES,
};

use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Transport statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Write calls
    pub writes: u64,
    /// Completed line reads (terminator seen)
    pub lines_received: u64,
    /// Reads that ended on the timeout
    pub timeouts: u64,
}

/// Blocking byte-stream endpoint to the instrument.
///
/// Every read is bounded by the transport's configured timeout. A read that times
/// out is not an error: `read_line` returns whatever arrived (possibly nothing) and
/// `read_byte` returns `None`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Open the endpoint
    fn open(&mut self) -> Result<(), TransportError>;

    /// Close the endpoint
    fn close(&mut self) -> Result<(), TransportError>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Write all bytes and flush
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read until a line feed (included in the result) or the timeout elapses
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Read a single byte, `None` on timeout
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError>;

    /// Get connection info string
    fn connection_info(&self) -> String;

    /// Get statistics
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_line()
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        (**self).read_byte()
    }

    fn connection_info(&self) -> String {
        (**self).connection_info()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}
