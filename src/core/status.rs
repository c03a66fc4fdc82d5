//! Status tables
//!
//! Fixed code tables from the controller manual. Lookups of codes outside a table
//! return `None`; the payload decoder turns that into `ProtocolError::UnknownCode`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which table a code was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeTable {
    /// Measurement status (0..=6)
    MeasurementStatus,
    /// Gauge identification tokens
    GaugeId,
    /// Pressure unit (0..=2)
    PressureUnit,
}

impl fmt::Display for CodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeasurementStatus => write!(f, "measurement status"),
            Self::GaugeId => write!(f, "gauge identification"),
            Self::PressureUnit => write!(f, "pressure unit"),
        }
    }
}

/// Measurement status reported with every pressure value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementStatus {
    /// Measurement data okay
    Okay,
    /// Underrange
    Underrange,
    /// Overrange
    Overrange,
    /// Sensor error
    SensorError,
    /// Sensor switched off
    SensorOff,
    /// No sensor connected
    NoSensor,
    /// Identification error
    IdentificationError,
}

impl MeasurementStatus {
    /// Get all statuses in code order
    pub fn all() -> &'static [MeasurementStatus] {
        &[
            Self::Okay,
            Self::Underrange,
            Self::Overrange,
            Self::SensorError,
            Self::SensorOff,
            Self::NoSensor,
            Self::IdentificationError,
        ]
    }

    /// Numeric code as sent by the device
    pub fn code(&self) -> u8 {
        match self {
            Self::Okay => 0,
            Self::Underrange => 1,
            Self::Overrange => 2,
            Self::SensorError => 3,
            Self::SensorOff => 4,
            Self::NoSensor => 5,
            Self::IdentificationError => 6,
        }
    }

    /// Look up a numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::all().get(usize::from(code)).copied()
    }

    /// Description from the manual
    pub fn description(&self) -> &'static str {
        match self {
            Self::Okay => "Measurement data okay",
            Self::Underrange => "Underrange",
            Self::Overrange => "Overrange",
            Self::SensorError => "Sensor error",
            Self::SensorOff => "Sensor off (IKR, PKR, IMR, PBR)",
            Self::NoSensor => "No sensor (output: 5,2.0000E-2 [mbar])",
            Self::IdentificationError => "Identification error",
        }
    }

    /// Check if the value can be trusted
    pub fn is_okay(&self) -> bool {
        matches!(self, Self::Okay)
    }
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Gauge type reported by TID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GaugeId {
    /// Pirani
    Tpr,
    /// Cold cathode, 1e-9 range
    Ikr9,
    /// Cold cathode, 1e-11 range
    Ikr11,
    /// FullRange cold cathode
    Pkr,
    /// FullRange Bayard-Alpert
    Pbr,
    /// Pirani / high pressure
    Imr,
    /// Linear (capacitive)
    Cmr,
    /// No sensor connected
    NoSensor,
    /// No identifier
    NoId,
}

impl GaugeId {
    /// Get all gauge ids
    pub fn all() -> &'static [GaugeId] {
        &[
            Self::Tpr,
            Self::Ikr9,
            Self::Ikr11,
            Self::Pkr,
            Self::Pbr,
            Self::Imr,
            Self::Cmr,
            Self::NoSensor,
            Self::NoId,
        ]
    }

    /// Wire token
    pub fn token(&self) -> &'static str {
        match self {
            Self::Tpr => "TPR",
            Self::Ikr9 => "IKR9",
            Self::Ikr11 => "IKR11",
            Self::Pkr => "PKR",
            Self::Pbr => "PBR",
            Self::Imr => "IMR",
            Self::Cmr => "CMR",
            Self::NoSensor => "noSEn",
            Self::NoId => "noid",
        }
    }

    /// Look up a wire token (case-sensitive, as sent by the device)
    pub fn from_token(token: &str) -> Option<Self> {
        Self::all().iter().copied().find(|id| id.token() == token)
    }

    /// Description from the manual
    pub fn description(&self) -> &'static str {
        match self {
            Self::Tpr => "Pirani Gauge or Pirani Capacitive gauge",
            Self::Ikr9 => "Cold Cathode Gauge 10E-9",
            Self::Ikr11 => "Cold Cathode Gauge 10E-11",
            Self::Pkr => "FullRange CC Gauge",
            Self::Pbr => "FullRange BA Gauge",
            Self::Imr => "Pirani / High Pressure Gauge",
            Self::Cmr => "Linear gauge",
            Self::NoSensor => "no SEnsor",
            Self::NoId => "no identifier",
        }
    }
}

impl fmt::Display for GaugeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Pressure unit reported by UNI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PressureUnit {
    /// Millibar (factory setting)
    #[default]
    Mbar,
    /// Torr
    Torr,
    /// Pascal
    Pascal,
}

impl PressureUnit {
    /// Numeric code
    pub fn code(&self) -> u8 {
        match self {
            Self::Mbar => 0,
            Self::Torr => 1,
            Self::Pascal => 2,
        }
    }

    /// Look up a numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Mbar),
            1 => Some(Self::Torr),
            2 => Some(Self::Pascal),
            _ => None,
        }
    }

    /// Unit symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Mbar => "mbar",
            Self::Torr => "Torr",
            Self::Pascal => "Pascal",
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_status_table() {
        for (code, status) in MeasurementStatus::all().iter().enumerate() {
            assert_eq!(usize::from(status.code()), code);
            assert_eq!(MeasurementStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(
            MeasurementStatus::from_code(0).unwrap().description(),
            "Measurement data okay"
        );
        assert_eq!(MeasurementStatus::from_code(7), None);
        assert!(!MeasurementStatus::Overrange.is_okay());
    }

    #[test]
    fn test_gauge_id_tokens() {
        assert_eq!(GaugeId::from_token("IKR11"), Some(GaugeId::Ikr11));
        assert_eq!(GaugeId::from_token("noSEn"), Some(GaugeId::NoSensor));
        assert_eq!(GaugeId::from_token("nosen"), None);
        assert_eq!(GaugeId::from_token("XYZ"), None);
        assert_eq!(GaugeId::Tpr.description(), "Pirani Gauge or Pirani Capacitive gauge");
    }

    #[test]
    fn test_unit_table() {
        assert_eq!(PressureUnit::from_code(0), Some(PressureUnit::Mbar));
        assert_eq!(PressureUnit::from_code(2).unwrap().to_string(), "Pascal");
        assert_eq!(PressureUnit::from_code(3), None);
        assert_eq!(PressureUnit::Torr.code(), 1);
    }
}
