//! Serial port transport implementation

use super::{Transport, TransportError, TransportStats};
use crate::core::protocol::LF;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Baud rates accepted by the controller
pub const SUPPORTED_BAUD_RATES: [u32; 3] = [9600, 19200, 38400];

/// Factory default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Serial port configuration
///
/// Framing is fixed by the instrument: 8 data bits, no parity, 1 stop bit and no
/// handshake. Only the port, baud rate and read timeout are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl SerialConfig {
    /// Create a new serial configuration with the default timeout
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set read timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Read timeout as a duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check the settings against what the controller supports
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.port.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "port name is empty".to_string(),
            ));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(TransportError::InvalidConfiguration(format!(
                "baud rate {} not supported (expected one of {:?})",
                self.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }
        if self.timeout_ms == 0 {
            return Err(TransportError::InvalidConfiguration(
                "read timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new("/dev/ttyUSB0", DEFAULT_BAUD_RATE)
    }
}

/// Serial port transport
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
    stats: TransportStats,
}

impl SerialTransport {
    /// Create a new serial transport (not opened yet)
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            stats: TransportStats::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.port.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(self.config.timeout_duration())
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => {
                    TransportError::PortNotFound(self.config.port.clone())
                }
                serialport::ErrorKind::Io(io_kind) => match io_kind {
                    ErrorKind::PermissionDenied => {
                        TransportError::PermissionDenied(self.config.port.clone())
                    }
                    ErrorKind::NotFound => TransportError::PortNotFound(self.config.port.clone()),
                    _ => TransportError::ConnectionFailed(e.to_string()),
                },
                serialport::ErrorKind::InvalidInput => {
                    TransportError::InvalidConfiguration(e.to_string())
                }
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        self.port = Some(port);
        self.stats = TransportStats::default();
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.port = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        port.write_all(data)?;
        port.flush()?;

        self.stats.bytes_sent += data.len() as u64;
        self.stats.writes += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        let deadline = Instant::now() + self.config.timeout_duration();

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => {}
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == LF {
                        self.stats.lines_received += 1;
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut => {
                    self.stats.timeouts += 1;
                    break;
                }
                Err(e) => return Err(TransportError::IoError(e)),
            }
            if Instant::now() >= deadline {
                self.stats.timeouts += 1;
                break;
            }
        }

        self.stats.bytes_received += line.len() as u64;
        Ok(line)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        let mut byte = [0u8; 1];
        match port.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => {
                self.stats.bytes_received += 1;
                Ok(Some(byte[0]))
            }
            Err(ref e) if e.kind() == ErrorKind::TimedOut => {
                self.stats.timeouts += 1;
                Ok(None)
            }
            Err(e) => Err(TransportError::IoError(e)),
        }
    }

    fn connection_info(&self) -> String {
        format!(
            "{} @ {} baud (8N1, no FC, timeout {} ms)",
            self.config.port, self.config.baud_rate, self.config.timeout_ms
        )
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout_duration(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unsupported_baud() {
        let config = SerialConfig::new("/dev/ttyUSB0", 115_200);
        assert!(matches!(
            config.validate(),
            Err(TransportError::InvalidConfiguration(_))
        ));

        for baud in SUPPORTED_BAUD_RATES {
            assert!(SerialConfig::new("COM4", baud).validate().is_ok());
        }
    }

    #[test]
    fn test_closed_port_refuses_io() {
        let mut transport = SerialTransport::new(SerialConfig::default());
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(b"PR1\r\n"),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_timeout_builder() {
        let config = SerialConfig::new("COM4", 19200).timeout(Duration::from_millis(250));
        assert_eq!(config.timeout_ms, 250);

        let transport = SerialTransport::new(config);
        assert!(transport.connection_info().starts_with("COM4 @ 19200"));
    }
}
