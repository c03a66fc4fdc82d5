//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::core::protocol::ProtocolError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// No answer within the read timeout
    pub const TIMEOUT: u8 = 4;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Protocol error
    pub const PROTOCOL_ERROR: u8 = 9;

    /// User cancelled
    pub const CANCELLED: u8 = 11;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Device rejected the command
    pub const NEGATIVE_ACKNOWLEDGE: u8 = 18;

    /// Loopback test failed
    pub const LOOPBACK_FAILED: u8 = 19;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a message for stdout
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Connection failure
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::Error(ExitCodes::CONNECTION_FAILED, msg.into())
    }

    /// Port missing
    pub fn port_not_found(port: &str) -> Self {
        Self::Error(ExitCodes::PORT_NOT_FOUND, format!("Port not found: {port}"))
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to `ExitCode`
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::NotFound => ExitCodes::FILE_NOT_FOUND,
            ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
            ErrorKind::ConnectionRefused => ExitCodes::CONNECTION_FAILED,
            ErrorKind::TimedOut => ExitCodes::TIMEOUT,
            _ => ExitCodes::ERROR,
        };

        Self::Error(code, err.to_string())
    }
}

/// Exit code for a transport failure
pub fn transport_exit_code(err: &TransportError) -> u8 {
    match err {
        TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
        TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
        TransportError::InvalidConfiguration(_) => ExitCodes::CONFIG_ERROR,
        TransportError::ConnectionFailed(_) | TransportError::NotConnected => {
            ExitCodes::CONNECTION_FAILED
        }
        TransportError::IoError(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            ExitCodes::TIMEOUT
        }
        TransportError::IoError(_) => ExitCodes::ERROR,
    }
}

impl From<&ProtocolError> for CliResult {
    fn from(err: &ProtocolError) -> Self {
        let code = match err {
            ProtocolError::Transport(e) => transport_exit_code(e),
            ProtocolError::NegativeAcknowledge => ExitCodes::NEGATIVE_ACKNOWLEDGE,
            // an empty answer means the read timed out
            ProtocolError::UnexpectedResponse(raw) if raw.is_empty() => ExitCodes::TIMEOUT,
            ProtocolError::InvalidArgument(_) => ExitCodes::INVALID_ARGS,
            ProtocolError::OutOfSequence { .. } => ExitCodes::INTERNAL_ERROR,
            ProtocolError::UnexpectedResponse(_)
            | ProtocolError::NoData
            | ProtocolError::MalformedPayload(_)
            | ProtocolError::UnknownCode { .. } => ExitCodes::PROTOCOL_ERROR,
        };
        Self::Error(code, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "No answer from device",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        9 => "Protocol error",
        11 => "Operation cancelled",
        14 => "Port not found",
        18 => "Negative acknowledge",
        19 => "Loopback test failed",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 6, 7, 8, 9, 11, 14, 18, 19, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let result = CliResult::from(err);
        assert_eq!(result.code(), ExitCodes::FILE_NOT_FOUND);
    }

    #[test]
    fn test_from_protocol_error() {
        let cases = [
            (ProtocolError::NegativeAcknowledge, ExitCodes::NEGATIVE_ACKNOWLEDGE),
            (ProtocolError::UnexpectedResponse(Vec::new()), ExitCodes::TIMEOUT),
            (ProtocolError::UnexpectedResponse(b"?".to_vec()), ExitCodes::PROTOCOL_ERROR),
            (ProtocolError::InvalidArgument("gauge 3".into()), ExitCodes::INVALID_ARGS),
            (
                ProtocolError::Transport(TransportError::PortNotFound("COM9".into())),
                ExitCodes::PORT_NOT_FOUND,
            ),
        ];
        for (err, code) in &cases {
            assert_eq!(CliResult::from(err).code(), *code, "{err}");
        }
    }
}
