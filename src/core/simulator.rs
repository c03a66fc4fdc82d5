//! Simulated gauge controllers
//!
//! Two stand-ins for development without hardware:
//! - [`SimulatedGauge`] implements [`PressureGauge`] directly and never touches a
//!   transport.
//! - [`VirtualDevice`] implements [`Transport`] and answers the wire protocol like
//!   the instrument does, so a real [`GaugeController`](crate::core::controller::GaugeController)
//!   can run end to end against it.
//!
//! Both draw pressures from the same [`DecayModel`]: an exponential pump-down
//! towards a floor pressure plus uniform noise.

use crate::core::controller::Channels;
use crate::core::gauge::PressureGauge;
use crate::core::protocol::{
    payload, Command, Gauge, ProtocolError, ACK_FRAME, CR, ENQ, ETX, LF, NAK_FRAME,
};
use crate::core::reading::{DualReading, GaugeIdentity, Reading};
use crate::core::state_machine::HandleState;
use crate::core::status::{GaugeId, MeasurementStatus, PressureUnit};
use crate::core::transport::{Transport, TransportError, TransportStats};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Firmware string reported by the simulated controllers
pub const SIMULATED_FIRMWARE: &str = "SIM-262";

/// Pressure reported by a channel with no sensor attached
const NO_SENSOR_PRESSURE: f64 = 2.0e-2;

/// Pump-down model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Floor pressure the curve approaches
    pub floor: f64,
    /// Initial excess pressure above the floor
    pub amplitude: f64,
    /// Exponential decay rate per reading
    pub decay_rate: f64,
    /// Half-width of the uniform noise band
    pub noise: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            floor: 5e-8,
            amplitude: 1e-6,
            decay_rate: 0.15,
            noise: 1e-9,
        }
    }
}

impl SimulatorConfig {
    /// Noise-free pressure at a given iteration
    pub fn expected(&self, iteration: u64) -> f64 {
        self.floor + self.amplitude * (-self.decay_rate * iteration as f64).exp()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Pressure source for the simulated controllers.
///
/// The iteration counter belongs to one instance and only moves forward.
#[derive(Debug, Clone)]
pub struct DecayModel {
    config: SimulatorConfig,
    iteration: u64,
    rng: StdRng,
}

impl DecayModel {
    /// Create a model seeded from the OS
    pub fn new(config: SimulatorConfig) -> Self {
        Self::from_rng(config, StdRng::from_entropy())
    }

    /// Create a reproducible model
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: SimulatorConfig, rng: StdRng) -> Self {
        Self {
            config,
            iteration: 0,
            rng,
        }
    }

    /// Get the parameters
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Readings produced so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Next point on the pump-down curve, rounded to 9 decimals
    pub fn next_pressure(&mut self) -> f64 {
        let band = self.config.noise;
        // a band whose width overflows cannot be sampled
        let noise = if band > 0.0 && (2.0 * band).is_finite() {
            self.rng.gen_range(-band..=band)
        } else {
            0.0
        };
        let value = round_to(self.config.expected(self.iteration) + noise, 9);
        self.iteration += 1;
        value
    }

    /// Independent readings for both channels
    pub fn next_pair(&mut self) -> (f64, f64) {
        let first = round_to(self.rng.gen_range(1e-7..2e-7), 9);
        let second = round_to(self.rng.gen_range(1e-6..2e-6), 8);
        (first, second)
    }
}

fn select(channels: Channels, which: u8) -> Result<Gauge, ProtocolError> {
    let gauge = Gauge::new(which)?;
    if channels.supports(gauge) {
        Ok(gauge)
    } else {
        Err(ProtocolError::InvalidArgument(format!(
            "gauge {gauge} not available on a {channels} channel controller"
        )))
    }
}

// ============ Simulated Gauge ============

/// In-process stand-in for a controller
#[derive(Debug, Clone)]
pub struct SimulatedGauge {
    model: DecayModel,
    channels: Channels,
    state: HandleState,
}

impl SimulatedGauge {
    /// Create a simulated controller
    pub fn new(config: SimulatorConfig, channels: Channels) -> Self {
        Self::from_model(DecayModel::new(config), channels)
    }

    /// Create a reproducible simulated controller
    pub fn with_seed(config: SimulatorConfig, channels: Channels, seed: u64) -> Self {
        Self::from_model(DecayModel::with_seed(config, seed), channels)
    }

    fn from_model(model: DecayModel, channels: Channels) -> Self {
        Self {
            model,
            channels,
            state: HandleState::Open,
        }
    }

    /// Readings produced so far
    pub fn iteration(&self) -> u64 {
        self.model.iteration()
    }

    /// Handle state
    pub fn state(&self) -> HandleState {
        self.state
    }

    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(TransportError::NotConnected.into())
        }
    }
}

impl PressureGauge for SimulatedGauge {
    fn open(&mut self) -> Result<(), ProtocolError> {
        self.state = HandleState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ProtocolError> {
        self.state = HandleState::Closed;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.is_open()
    }

    fn program_number(&mut self) -> Result<String, ProtocolError> {
        self.ensure_open()?;
        Ok(SIMULATED_FIRMWARE.to_string())
    }

    fn read_gauge(&mut self, which: u8) -> Result<Reading, ProtocolError> {
        self.ensure_open()?;
        select(self.channels, which)?;
        Ok(Reading::new(self.model.next_pressure(), MeasurementStatus::Okay))
    }

    fn read_both(&mut self) -> Result<DualReading, ProtocolError> {
        self.ensure_open()?;
        select(self.channels, 2)?;
        let (first, second) = self.model.next_pair();
        Ok(DualReading {
            gauge1: Reading::new(first, MeasurementStatus::Okay),
            gauge2: Reading::new(second, MeasurementStatus::Okay),
        })
    }

    fn identify(&mut self) -> Result<(GaugeIdentity, GaugeIdentity), ProtocolError> {
        self.ensure_open()?;
        Ok((GaugeId::Tpr.into(), GaugeId::Ikr9.into()))
    }

    fn unit(&mut self) -> Result<PressureUnit, ProtocolError> {
        self.ensure_open()?;
        Ok(PressureUnit::Mbar)
    }

    fn loopback_test(&mut self) -> Result<bool, ProtocolError> {
        self.ensure_open()?;
        Ok(true)
    }

    fn description(&self) -> String {
        format!(
            "simulated {} channel controller (iteration {})",
            self.channels,
            self.model.iteration()
        )
    }
}

// ============ Virtual Device ============

/// Wire-level emulation of a dual-channel controller.
///
/// Writes are parsed as the instrument would: `<mnemonic> CR LF` frames are
/// acknowledged (or rejected with NAK when unknown) and the reply is held until
/// an ENQ arrives. After RST every byte is echoed until the framed ETX.
#[derive(Debug)]
pub struct VirtualDevice {
    model: DecayModel,
    open: bool,
    responsive: bool,
    frame: Vec<u8>,
    outgoing: VecDeque<u8>,
    pending: Option<String>,
    test_mode: bool,
    status: [MeasurementStatus; 2],
    ids: (GaugeId, GaugeId),
    unit: PressureUnit,
    received: Vec<Command>,
    stats: TransportStats,
}

impl VirtualDevice {
    /// Create a closed virtual device
    pub fn new(config: SimulatorConfig) -> Self {
        Self::from_model(DecayModel::new(config))
    }

    /// Create a reproducible virtual device
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self::from_model(DecayModel::with_seed(config, seed))
    }

    fn from_model(model: DecayModel) -> Self {
        Self {
            model,
            open: false,
            responsive: true,
            frame: Vec::new(),
            outgoing: VecDeque::new(),
            pending: None,
            test_mode: false,
            status: [MeasurementStatus::Okay; 2],
            ids: (GaugeId::Tpr, GaugeId::Ikr9),
            unit: PressureUnit::Mbar,
            received: Vec::new(),
            stats: TransportStats::default(),
        }
    }

    /// Force the status reported for one gauge
    pub fn set_gauge_status(&mut self, gauge: Gauge, status: MeasurementStatus) {
        self.status[usize::from(gauge.index() - 1)] = status;
    }

    /// Change the reported unit
    pub fn set_unit(&mut self, unit: PressureUnit) {
        self.unit = unit;
    }

    /// Change the reported gauge types
    pub fn set_gauge_ids(&mut self, first: GaugeId, second: GaugeId) {
        self.ids = (first, second);
    }

    /// Stop answering, as an unplugged cable would
    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    /// Check if the RS232 test is running
    pub fn in_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Commands recognized so far
    pub fn received(&self) -> &[Command] {
        &self.received
    }

    /// Pump-down readings produced so far
    pub fn iteration(&self) -> u64 {
        self.model.iteration()
    }

    fn emit(&mut self, bytes: &[u8]) {
        if self.responsive {
            self.outgoing.extend(bytes.iter().copied());
        }
    }

    fn reading(&mut self, gauge: Gauge, value: f64) -> Reading {
        let status = self.status[usize::from(gauge.index() - 1)];
        let value = if status == MeasurementStatus::NoSensor {
            NO_SENSOR_PRESSURE
        } else {
            value
        };
        Reading::new(value, status)
    }

    fn respond(&mut self, command: Command) -> Option<String> {
        match command {
            Command::ProgramNumber => Some(SIMULATED_FIRMWARE.to_string()),
            Command::Pressure(gauge) => {
                let value = if gauge == Gauge::ONE {
                    self.model.next_pressure()
                } else {
                    self.model.next_pair().1
                };
                let reading = self.reading(gauge, value);
                Some(payload::format_reading(&reading))
            }
            Command::PressureBoth => {
                let (first, second) = self.model.next_pair();
                let dual = DualReading {
                    gauge1: self.reading(Gauge::ONE, first),
                    gauge2: self.reading(Gauge::TWO, second),
                };
                Some(payload::format_dual_reading(&dual))
            }
            Command::GaugeIdentification => {
                Some(payload::format_identification(self.ids.0, self.ids.1))
            }
            Command::PressureUnit => Some(payload::format_unit(self.unit)),
            Command::CommunicationTest => {
                self.test_mode = true;
                None
            }
            Command::EndOfText => None,
        }
    }

    fn accept_frame(&mut self) {
        let frame = std::mem::take(&mut self.frame);
        match Command::decode(&frame) {
            Some(command) => {
                self.received.push(command);
                self.pending = self.respond(command);
                self.emit(&ACK_FRAME);
            }
            None => {
                self.pending = None;
                self.emit(&NAK_FRAME);
            }
        }
    }

    fn feed(&mut self, byte: u8) {
        if self.test_mode {
            self.feed_test_mode(byte);
            return;
        }
        if byte == ENQ && self.frame.is_empty() {
            let data = self.pending.take().unwrap_or_default();
            self.emit(data.as_bytes());
            self.emit(&[CR, LF]);
            return;
        }
        self.frame.push(byte);
        if byte == LF {
            self.accept_frame();
        }
    }

    fn feed_test_mode(&mut self, byte: u8) {
        const END: [u8; 3] = [ETX, CR, LF];
        if byte == ETX || !self.frame.is_empty() {
            self.frame.push(byte);
            if self.frame == END {
                self.frame.clear();
                self.test_mode = false;
                self.received.push(Command::EndOfText);
                self.emit(&ACK_FRAME);
            } else if !END.starts_with(&self.frame) {
                let partial = std::mem::take(&mut self.frame);
                self.emit(&partial);
            }
        } else {
            self.emit(&[byte]);
        }
    }
}

impl Transport for VirtualDevice {
    fn open(&mut self) -> Result<(), TransportError> {
        self.open = true;
        self.stats = TransportStats::default();
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        self.frame.clear();
        self.outgoing.clear();
        self.pending = None;
        self.test_mode = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        for &byte in data {
            self.feed(byte);
        }
        self.stats.bytes_sent += data.len() as u64;
        self.stats.writes += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        let mut line = Vec::new();
        while let Some(byte) = self.outgoing.pop_front() {
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
        let byte = self.outgoing.pop_front();
        match byte {
            Some(_) => self.stats.bytes_received += 1,
            None => self.stats.timeouts += 1,
        }
        Ok(byte)
    }

    fn connection_info(&self) -> String {
        "virtual TPG 262".to_string()
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::framing;

    #[test]
    fn test_decay_trend_within_noise() {
        let config = SimulatorConfig::default();
        let mut gauge = SimulatedGauge::with_seed(config, Channels::Dual, 42);
        let mut previous = f64::INFINITY;
        for iteration in 0..50 {
            let reading = gauge.read_gauge(1).unwrap();
            assert_eq!(reading.status_code(), 0);
            assert!((reading.value - config.expected(iteration)).abs() <= config.noise + 1e-9);
            assert!(reading.value <= previous + 2.0 * config.noise + 1e-9);
            previous = reading.value;
        }
        assert_eq!(gauge.iteration(), 50);
    }

    #[test]
    fn test_overflowing_noise_band_is_skipped() {
        let config = SimulatorConfig {
            noise: f64::MAX,
            ..SimulatorConfig::default()
        };
        let mut model = DecayModel::with_seed(config, 1);
        let value = model.next_pressure();
        assert!((value - round_to(config.expected(0), 9)).abs() < 1e-15);
    }

    #[test]
    fn test_instances_are_independent() {
        let mut first = SimulatedGauge::new(SimulatorConfig::default(), Channels::Dual);
        let second = SimulatedGauge::new(SimulatorConfig::default(), Channels::Dual);
        for _ in 0..5 {
            first.read_gauge(1).unwrap();
        }
        assert_eq!(first.iteration(), 5);
        assert_eq!(second.iteration(), 0);
    }

    #[test]
    fn test_simulated_fixed_answers() {
        let mut gauge = SimulatedGauge::new(SimulatorConfig::default(), Channels::Dual);
        let (a, b) = gauge.identify().unwrap();
        assert_eq!((a.code, b.code), (GaugeId::Tpr, GaugeId::Ikr9));
        assert_eq!(gauge.unit().unwrap(), PressureUnit::Mbar);
        assert!(gauge.loopback_test().unwrap());
        assert_eq!(gauge.program_number().unwrap(), SIMULATED_FIRMWARE);

        let dual = gauge.read_both().unwrap();
        assert!((1e-7..=2e-7).contains(&dual.gauge1.value));
        assert!((1e-6..=2e-6).contains(&dual.gauge2.value));
        assert!(dual.gauge1.is_okay() && dual.gauge2.is_okay());
    }

    #[test]
    fn test_simulated_validates_gauge() {
        let mut gauge = SimulatedGauge::new(SimulatorConfig::default(), Channels::Single);
        assert!(matches!(gauge.read_gauge(3), Err(ProtocolError::InvalidArgument(_))));
        assert!(matches!(gauge.read_gauge(2), Err(ProtocolError::InvalidArgument(_))));
        assert!(matches!(gauge.read_both(), Err(ProtocolError::InvalidArgument(_))));
        assert_eq!(gauge.iteration(), 0);
    }

    #[test]
    fn test_open_close_toggle_state() {
        let mut gauge = SimulatedGauge::new(SimulatorConfig::default(), Channels::Dual);
        assert!(gauge.is_open());
        gauge.close().unwrap();
        assert!(!gauge.is_open());
        gauge.open().unwrap();
        assert!(gauge.is_open());
    }

    #[test]
    fn test_closed_simulated_gauge_refuses_commands() {
        let mut gauge = SimulatedGauge::with_seed(SimulatorConfig::default(), Channels::Dual, 5);
        gauge.close().unwrap();
        assert!(matches!(
            gauge.read_gauge(1),
            Err(ProtocolError::Transport(TransportError::NotConnected))
        ));
        assert!(gauge.unit().is_err());
        assert!(gauge.loopback_test().is_err());
        assert_eq!(gauge.iteration(), 0);

        gauge.open().unwrap();
        assert!(gauge.read_gauge(1).unwrap().is_okay());
        assert_eq!(gauge.iteration(), 1);
    }

    #[test]
    fn test_virtual_device_ack_then_data() {
        let mut device = VirtualDevice::with_seed(SimulatorConfig::default(), 1);
        device.open().unwrap();
        device.write(b"TID\r\n").unwrap();
        assert_eq!(device.read_line().unwrap(), ACK_FRAME);
        device.write(&[ENQ]).unwrap();
        assert_eq!(device.read_line().unwrap(), b"TPR,IKR9\r\n");
    }

    #[test]
    fn test_virtual_device_naks_unknown() {
        let mut device = VirtualDevice::new(SimulatorConfig::default());
        device.open().unwrap();
        device.write(b"SEN\r\n").unwrap();
        assert_eq!(device.read_line().unwrap(), NAK_FRAME);
        assert!(device.received().is_empty());
    }

    #[test]
    fn test_virtual_device_test_mode_echo() {
        let mut device = VirtualDevice::new(SimulatorConfig::default());
        device.open().unwrap();
        device.write(b"RST\r\n").unwrap();
        assert_eq!(device.read_line().unwrap(), ACK_FRAME);
        assert!(device.in_test_mode());

        device.write(b"a").unwrap();
        device.write(&[ENQ]).unwrap();
        let line = device.read_line().unwrap();
        assert_eq!(framing::strip_trailing(&line, ENQ), b"a");

        device.write(&[ETX, CR, LF]).unwrap();
        assert_eq!(device.read_line().unwrap(), ACK_FRAME);
        assert!(!device.in_test_mode());
    }

    #[test]
    fn test_virtual_device_reports_forced_status() {
        let mut device = VirtualDevice::new(SimulatorConfig::default());
        device.set_gauge_status(Gauge::TWO, MeasurementStatus::NoSensor);
        device.open().unwrap();
        device.write(b"PR2\r\n").unwrap();
        device.read_line().unwrap();
        device.write(&[ENQ]).unwrap();
        assert_eq!(device.read_line().unwrap(), b"5,+2.0000E-02\r\n");
    }

    #[test]
    fn test_unresponsive_device_times_out() {
        let mut device = VirtualDevice::new(SimulatorConfig::default());
        device.set_responsive(false);
        device.open().unwrap();
        device.write(b"PR1\r\n").unwrap();
        assert!(device.read_line().unwrap().is_empty());
        assert_eq!(device.stats().timeouts, 1);
    }
}
