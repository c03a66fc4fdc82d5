//! Gauge controller handle
//!
//! [`GaugeController`] owns one transport and exposes the command set through
//! [`PressureGauge`]. Single- and dual-channel controllers share this type; the
//! [`Channels`] flag only restricts which gauges may be addressed.

use crate::core::gauge::PressureGauge;
use crate::core::protocol::{payload, strip_trailing, Command, Exchange, Gauge, ProtocolError, ENQ};
use crate::core::reading::{DualReading, GaugeIdentity, Reading};
use crate::core::state_machine::{ExchangeState, HandleState};
use crate::core::status::PressureUnit;
use crate::core::transport::{SerialConfig, SerialTransport, Transport, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on bytes discarded when clearing the output buffer
pub const DEFAULT_DRAIN_LIMIT: usize = 64;

/// Characters echoed back during the RS232 test
pub const LOOPBACK_PROBE: &[u8] = b"a1";

/// Number of gauge channels on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    /// TPG 261: one gauge
    Single,
    /// TPG 262: two gauges
    #[default]
    Dual,
}

impl Channels {
    /// Number of channels
    pub fn count(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
        }
    }

    /// Check if a gauge exists on this controller
    pub fn supports(&self, gauge: Gauge) -> bool {
        gauge.index() <= self.count()
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Dual => write!(f, "dual"),
        }
    }
}

impl FromStr for Channels {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "1" => Ok(Self::Single),
            "dual" | "2" => Ok(Self::Dual),
            other => Err(format!("unknown channel count: {other}")),
        }
    }
}

/// Handle to a real controller behind a transport
#[derive(Debug)]
pub struct GaugeController<T> {
    exchange: Exchange<T>,
    channels: Channels,
    state: HandleState,
    drain_limit: usize,
}

impl GaugeController<SerialTransport> {
    /// Open a controller on a serial port
    pub fn open_serial(config: SerialConfig, channels: Channels) -> Result<Self, ProtocolError> {
        let mut controller = Self::new(SerialTransport::new(config), channels);
        controller.open()?;
        Ok(controller)
    }
}

impl<T: Transport> GaugeController<T> {
    /// Create a closed handle over a transport
    pub fn new(transport: T, channels: Channels) -> Self {
        Self {
            exchange: Exchange::new(transport),
            channels,
            state: HandleState::Closed,
            drain_limit: DEFAULT_DRAIN_LIMIT,
        }
    }

    /// Set the bound used when clearing the output buffer
    #[must_use]
    pub fn with_drain_limit(mut self, limit: usize) -> Self {
        self.drain_limit = limit;
        self
    }

    /// Handle state
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Exchange phase
    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange.state()
    }

    /// Channel capability
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Get the transport
    pub fn transport(&self) -> &T {
        self.exchange.transport()
    }

    /// Unwrap the transport
    pub fn into_transport(self) -> T {
        self.exchange.into_transport()
    }

    /// Write a command frame and check the acknowledge
    pub fn send_command(&mut self, command: Command) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        self.exchange.send_command(command)
    }

    /// Enquire the data line of the last acknowledged command
    pub fn poll_data(&mut self) -> Result<String, ProtocolError> {
        self.ensure_open()?;
        self.exchange.poll_data()
    }

    fn query(&mut self, command: Command) -> Result<String, ProtocolError> {
        self.send_command(command)?;
        self.exchange.poll_data()
    }

    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(TransportError::NotConnected.into())
        }
    }

    fn select(&self, which: u8) -> Result<Gauge, ProtocolError> {
        let gauge = Gauge::new(which)?;
        if self.channels.supports(gauge) {
            Ok(gauge)
        } else {
            Err(ProtocolError::InvalidArgument(format!(
                "gauge {gauge} not available on a {} channel controller",
                self.channels
            )))
        }
    }

    fn require_dual(&self) -> Result<(), ProtocolError> {
        match self.channels {
            Channels::Dual => Ok(()),
            Channels::Single => Err(ProtocolError::InvalidArgument(
                "reading both gauges needs a dual channel controller".to_string(),
            )),
        }
    }
}

impl<T: Transport> PressureGauge for GaugeController<T> {
    fn open(&mut self) -> Result<(), ProtocolError> {
        if self.state.is_open() {
            return Ok(());
        }
        self.exchange.transport_mut().open()?;
        self.exchange.reset();
        self.state = HandleState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ProtocolError> {
        self.exchange.reset();
        self.state = HandleState::Closed;
        self.exchange.transport_mut().close()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.is_open()
    }

    fn program_number(&mut self) -> Result<String, ProtocolError> {
        self.query(Command::ProgramNumber)
    }

    fn read_gauge(&mut self, which: u8) -> Result<Reading, ProtocolError> {
        let gauge = self.select(which)?;
        let data = self.query(Command::Pressure(gauge))?;
        payload::parse_reading(&data)
    }

    fn read_both(&mut self) -> Result<DualReading, ProtocolError> {
        self.require_dual()?;
        let data = self.query(Command::PressureBoth)?;
        payload::parse_dual_reading(&data)
    }

    fn identify(&mut self) -> Result<(GaugeIdentity, GaugeIdentity), ProtocolError> {
        let data = self.query(Command::GaugeIdentification)?;
        payload::parse_identification(&data)
    }

    fn unit(&mut self) -> Result<PressureUnit, ProtocolError> {
        let data = self.query(Command::PressureUnit)?;
        payload::parse_unit(&data)
    }

    fn loopback_test(&mut self) -> Result<bool, ProtocolError> {
        self.send_command(Command::CommunicationTest)?;
        self.exchange.enquire()?;
        self.exchange.drain(self.drain_limit)?;

        let mut echo = Vec::with_capacity(LOOPBACK_PROBE.len());
        for &probe in LOOPBACK_PROBE {
            self.exchange.write_raw(&[probe])?;
            let line = self.exchange.poll_raw()?;
            echo.extend_from_slice(strip_trailing(&line, ENQ));
        }

        self.exchange.finish()?;
        self.exchange.end_of_text()?;
        Ok(echo == LOOPBACK_PROBE)
    }

    fn description(&self) -> String {
        format!(
            "{} channel controller on {}",
            self.channels,
            self.exchange.transport().connection_info()
        )
    }
}
