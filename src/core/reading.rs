//! Decoded measurement values

use crate::core::status::{GaugeId, MeasurementStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pressure measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Pressure in the controller's current unit
    pub value: f64,
    /// Measurement status
    pub status: MeasurementStatus,
}

impl Reading {
    /// Create a reading
    pub fn new(value: f64, status: MeasurementStatus) -> Self {
        Self { value, status }
    }

    /// Numeric status code
    pub fn status_code(&self) -> u8 {
        self.status.code()
    }

    /// Status description
    pub fn status_text(&self) -> &'static str {
        self.status.description()
    }

    /// Check if the status is okay
    pub fn is_okay(&self) -> bool {
        self.status.is_okay()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4e} ({})", self.value, self.status_text())
    }
}

/// Both gauges from one PRX exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualReading {
    /// Gauge 1
    pub gauge1: Reading,
    /// Gauge 2
    pub gauge2: Reading,
}

/// Gauge type of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GaugeIdentity {
    /// Token as sent by the device
    pub code: GaugeId,
    /// Description from the manual
    pub description: &'static str,
}

impl From<GaugeId> for GaugeIdentity {
    fn from(code: GaugeId) -> Self {
        Self {
            code,
            description: code.description(),
        }
    }
}

impl fmt::Display for GaugeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_status_accessors() {
        let reading = Reading::new(1.0e-5, MeasurementStatus::Okay);
        assert_eq!(reading.status_code(), 0);
        assert_eq!(reading.status_text(), "Measurement data okay");
        assert!(reading.is_okay());
        assert_eq!(reading.to_string(), "1.0000e-5 (Measurement data okay)");
    }

    #[test]
    fn test_identity_from_id() {
        let identity = GaugeIdentity::from(GaugeId::Ikr9);
        assert_eq!(identity.description, "Cold Cathode Gauge 10E-9");
        assert_eq!(identity.to_string(), "IKR9 (Cold Cathode Gauge 10E-9)");
    }
}
