//! Protocol implementation for the TPG 26x serial interface
//!
//! Provides:
//! - Control bytes and CR LF framing
//! - The supported command mnemonics
//! - The acknowledge / enquiry exchange
//! - Reply payload grammar (comma separated ASCII fields)

pub mod command;
pub mod exchange;
pub mod framing;
pub mod payload;

pub use command::{Command, Gauge};
pub use exchange::Exchange;
pub use framing::{
    classify, frame, strip_terminator, strip_trailing, Acknowledgement, ACK, ACK_FRAME, CR, ENQ,
    ETX, LF, NAK, NAK_FRAME,
};

use crate::core::state_machine::ExchangeState;
use crate::core::status::CodeTable;
use crate::core::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the command set.
///
/// Variants carrying bytes keep the raw device output so callers can log it.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Open, write or read failure on the byte stream
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device rejected the command
    #[error("Device answered with negative acknowledge")]
    NegativeAcknowledge,

    /// Anything other than ACK where ACK was expected, including an empty read
    #[error("Unexpected response: {}", describe_raw(.0))]
    UnexpectedResponse(Vec<u8>),

    /// Acknowledged, but the data line was empty
    #[error("Device returned no data")]
    NoData,

    /// Wrong field count, non-numeric field or non-ASCII payload
    #[error("Malformed payload: {}", describe_raw(.0))]
    MalformedPayload(Vec<u8>),

    /// A code missing from its lookup table
    #[error("Unknown {table} code: {code:?}")]
    UnknownCode {
        /// Table that was consulted
        table: CodeTable,
        /// The offending code as received
        code: String,
    },

    /// Rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Exchange step issued in the wrong state, e.g. an enquiry with no command pending
    #[error("Exchange out of sequence: {from:?} -> {to:?}")]
    OutOfSequence {
        /// State the exchange was in
        from: ExchangeState,
        /// State the step required
        to: ExchangeState,
    },
}

impl ProtocolError {
    /// Raw device bytes carried by the error, if any
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::UnexpectedResponse(raw) | Self::MalformedPayload(raw) => Some(raw),
            _ => None,
        }
    }

    /// True for faults in what the device said, as opposed to the link or the caller
    pub fn is_device_fault(&self) -> bool {
        matches!(
            self,
            Self::NegativeAcknowledge
                | Self::UnexpectedResponse(_)
                | Self::NoData
                | Self::MalformedPayload(_)
                | Self::UnknownCode { .. }
        )
    }
}

fn describe_raw(raw: &[u8]) -> String {
    if raw.is_empty() {
        "<empty>".to_string()
    } else {
        format!("{:?} (hex {})", String::from_utf8_lossy(raw), hex::encode(raw))
    }
}
