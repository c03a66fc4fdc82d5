//! Supported command mnemonics

use super::framing::{self, ETX};
use super::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// A measurement channel, 1 or 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gauge(u8);

impl Gauge {
    /// Gauge 1
    pub const ONE: Gauge = Gauge(1);
    /// Gauge 2
    pub const TWO: Gauge = Gauge(2);

    /// Validate a gauge index
    pub fn new(index: u8) -> Result<Self, ProtocolError> {
        match index {
            1 | 2 => Ok(Self(index)),
            _ => Err(ProtocolError::InvalidArgument(format!(
                "gauge number can only be 1 or 2, got {index}"
            ))),
        }
    }

    /// The 1-based index
    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Command sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// PNR: program number (firmware version)
    ProgramNumber,
    /// PR1 / PR2: pressure of one gauge
    Pressure(Gauge),
    /// PRX: pressure of both gauges
    PressureBoth,
    /// TID: transmitter identification
    GaugeIdentification,
    /// UNI: pressure unit
    PressureUnit,
    /// RST: RS232 loopback test
    CommunicationTest,
    /// ETX: leaves the loopback test
    EndOfText,
}

impl Command {
    /// Get all commands
    pub fn all() -> &'static [Command] {
        &[
            Command::ProgramNumber,
            Command::Pressure(Gauge::ONE),
            Command::Pressure(Gauge::TWO),
            Command::PressureBoth,
            Command::GaugeIdentification,
            Command::PressureUnit,
            Command::CommunicationTest,
            Command::EndOfText,
        ]
    }

    /// Wire mnemonic, without terminator
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Command::ProgramNumber => "PNR",
            Command::Pressure(Gauge(1)) => "PR1",
            Command::Pressure(_) => "PR2",
            Command::PressureBoth => "PRX",
            Command::GaugeIdentification => "TID",
            Command::PressureUnit => "UNI",
            Command::CommunicationTest => "RST",
            Command::EndOfText => "\u{3}",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Command::ProgramNumber => "Program number",
            Command::Pressure(_) => "Pressure measurement",
            Command::PressureBoth => "Pressure measurement (both gauges)",
            Command::GaugeIdentification => "Gauge identification",
            Command::PressureUnit => "Pressure unit",
            Command::CommunicationTest => "RS232 test",
            Command::EndOfText => "End of text",
        }
    }

    /// Whether an enquiry phase follows the acknowledge
    pub fn expects_data(&self) -> bool {
        !matches!(self, Command::EndOfText)
    }

    /// Encode as a complete command frame
    pub fn encode(&self) -> Vec<u8> {
        framing::frame(self.mnemonic().as_bytes())
    }

    /// Decode a complete command frame (`<mnemonic> CR LF`)
    pub fn decode(frame: &[u8]) -> Option<Command> {
        let body = frame.strip_suffix(&[framing::CR, framing::LF])?;
        if body == [ETX] {
            return Some(Command::EndOfText);
        }
        std::str::from_utf8(body).ok()?.parse().ok()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::EndOfText => write!(f, "ETX"),
            other => write!(f, "{}", other.mnemonic()),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PNR" => Ok(Command::ProgramNumber),
            "PR1" => Ok(Command::Pressure(Gauge::ONE)),
            "PR2" => Ok(Command::Pressure(Gauge::TWO)),
            "PRX" => Ok(Command::PressureBoth),
            "TID" => Ok(Command::GaugeIdentification),
            "UNI" => Ok(Command::PressureUnit),
            "RST" => Ok(Command::CommunicationTest),
            "ETX" | "\u{3}" => Ok(Command::EndOfText),
            other => Err(ProtocolError::InvalidArgument(format!(
                "unsupported command: {other:?}"
            ))),
        }
    }
}
