//! Scripted transport for deterministic exchanges without hardware.
//!
//! [`ScriptedTransport`] replays pre-loaded device output and records every write,
//! so protocol code can be checked byte for byte.
//!
//! # Example
//!
//! ```
//! use tpg26x_core::core::transport::{ScriptedTransport, Transport};
//!
//! let mut transport = ScriptedTransport::new();
//! transport.push_line(b"\x06");
//! transport.push_line(b"0,1.0000E-05");
//! transport.open().unwrap();
//! transport.write(b"PR1\r\n").unwrap();
//! assert_eq!(transport.read_line().unwrap(), b"\x06\r\n");
//! ```

use super::{Transport, TransportError, TransportStats};
use crate::core::protocol::{CR, LF};
use std::collections::VecDeque;

/// A [`Transport`] that plays back queued bytes and logs what was written.
///
/// When the queue runs dry, reads behave like a timed-out serial port: `read_line`
/// yields an empty line and `read_byte` yields `None`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    /// Bytes the "device" will emit, in order
    incoming: VecDeque<u8>,
    /// Log of all write calls
    written: Vec<Vec<u8>>,
    open: bool,
    /// Refuse to open, as an absent port would
    unavailable: bool,
    stats: TransportStats,
}

impl ScriptedTransport {
    /// Create a new, closed scripted transport
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose port cannot be opened
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Queue raw bytes exactly as given
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Queue a line, appending CR LF
    pub fn push_line(&mut self, line: &[u8]) {
        self.push_bytes(line);
        self.push_bytes(&[CR, LF]);
    }

    /// Every write call, in order
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// All written bytes concatenated
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.concat()
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.unavailable {
            return Err(TransportError::PortNotFound("scripted".to_string()));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        self.written.push(data.to_vec());
        self.stats.bytes_sent += data.len() as u64;
        self.stats.writes += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        let mut line = Vec::new();
        while let Some(byte) = self.incoming.pop_front() {
            line.push(byte);
            if byte == LF {
                self.stats.lines_received += 1;
                self.stats.bytes_received += line.len() as u64;
                return Ok(line);
            }
        }
        self.stats.timeouts += 1;
        self.stats.bytes_received += line.len() as u64;
        Ok(line)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        let byte = self.incoming.pop_front();
        match byte {
            Some(_) => self.stats.bytes_received += 1,
            None => self.stats.timeouts += 1,
        }
        Ok(byte)
    }

    fn connection_info(&self) -> String {
        format!("scripted ({} bytes queued)", self.incoming.len())
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_splits_on_lf() {
        let mut transport = ScriptedTransport::new();
        transport.push_line(b"first");
        transport.push_line(b"second");
        transport.open().unwrap();

        assert_eq!(transport.read_line().unwrap(), b"first\r\n");
        assert_eq!(transport.read_line().unwrap(), b"second\r\n");
        assert!(transport.read_line().unwrap().is_empty());
        assert_eq!(transport.stats().timeouts, 1);
    }

    #[test]
    fn test_partial_line_on_timeout() {
        let mut transport = ScriptedTransport::new();
        transport.push_bytes(b"0,1.0");
        transport.open().unwrap();

        assert_eq!(transport.read_line().unwrap(), b"0,1.0");
        assert_eq!(transport.read_byte().unwrap(), None);
    }

    #[test]
    fn test_records_writes() {
        let mut transport = ScriptedTransport::new();
        transport.open().unwrap();
        transport.write(b"PR1\r\n").unwrap();
        transport.write(&[0x05]).unwrap();

        assert_eq!(transport.written().len(), 2);
        assert_eq!(transport.written_bytes(), b"PR1\r\n\x05");
    }

    #[test]
    fn test_closed_or_unavailable() {
        let mut transport = ScriptedTransport::new();
        assert!(matches!(transport.write(b"x"), Err(TransportError::NotConnected)));

        let mut missing = ScriptedTransport::unavailable();
        assert!(matches!(missing.open(), Err(TransportError::PortNotFound(_))));
        assert!(!missing.is_open());
    }
}
