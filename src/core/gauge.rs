//! Capability surface shared by the real controller and the simulated peer

use crate::core::protocol::ProtocolError;
use crate::core::reading::{DualReading, GaugeIdentity, Reading};
use crate::core::status::PressureUnit;
use parking_lot::Mutex;
use std::sync::Arc;

/// Operations every gauge controller supports.
///
/// Each call is one blocking exchange. Protocol failures leave the handle open;
/// calls on a closed handle fail with `Transport(NotConnected)` before any I/O.
pub trait PressureGauge: Send {
    /// Open the handle
    fn open(&mut self) -> Result<(), ProtocolError>;

    /// Close the handle
    fn close(&mut self) -> Result<(), ProtocolError>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Firmware version (PNR)
    fn program_number(&mut self) -> Result<String, ProtocolError>;

    /// Pressure of gauge 1 or 2 (PR1 / PR2)
    fn read_gauge(&mut self, which: u8) -> Result<Reading, ProtocolError>;

    /// Pressure of both gauges (PRX)
    fn read_both(&mut self) -> Result<DualReading, ProtocolError>;

    /// Gauge types (TID)
    fn identify(&mut self) -> Result<(GaugeIdentity, GaugeIdentity), ProtocolError>;

    /// Pressure unit (UNI)
    fn unit(&mut self) -> Result<PressureUnit, ProtocolError>;

    /// RS232 loopback test (RST)
    fn loopback_test(&mut self) -> Result<bool, ProtocolError>;

    /// Short description for logs
    fn description(&self) -> String;
}

impl<G: PressureGauge + ?Sized> PressureGauge for Box<G> {
    fn open(&mut self) -> Result<(), ProtocolError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), ProtocolError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn program_number(&mut self) -> Result<String, ProtocolError> {
        (**self).program_number()
    }

    fn read_gauge(&mut self, which: u8) -> Result<Reading, ProtocolError> {
        (**self).read_gauge(which)
    }

    fn read_both(&mut self) -> Result<DualReading, ProtocolError> {
        (**self).read_both()
    }

    fn identify(&mut self) -> Result<(GaugeIdentity, GaugeIdentity), ProtocolError> {
        (**self).identify()
    }

    fn unit(&mut self) -> Result<PressureUnit, ProtocolError> {
        (**self).unit()
    }

    fn loopback_test(&mut self) -> Result<bool, ProtocolError> {
        (**self).loopback_test()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// A gauge handle shared between threads.
///
/// The mutex is the only serialization point; every exchange runs with it held.
#[derive(Clone)]
pub struct SharedGauge {
    inner: Arc<Mutex<Box<dyn PressureGauge>>>,
}

impl SharedGauge {
    /// Wrap a gauge
    pub fn new(gauge: Box<dyn PressureGauge>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(gauge)),
        }
    }

    /// Run one or more exchanges with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn PressureGauge) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut **guard)
    }

    /// Read one gauge
    pub fn read_gauge(&self, which: u8) -> Result<Reading, ProtocolError> {
        self.with(|gauge| gauge.read_gauge(which))
    }

    /// Description of the wrapped gauge
    pub fn description(&self) -> String {
        self.inner.lock().description()
    }
}
