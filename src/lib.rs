//! # TPG26x Core Library
//!
//! Serial communication with Pfeiffer TPG 261 / TPG 262 class vacuum gauge
//! controllers:
//! - Request / acknowledge framing with strict CR LF delimiting
//! - Enquiry based data retrieval
//! - Pressure, status, gauge type and unit decoding
//! - A simulated peer with the same capability surface
//!
//! ## Example
//!
//! ```rust,no_run
//! use tpg26x_core::{Channels, GaugeController, PressureGauge, SerialConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = SerialConfig::new("/dev/ttyUSB0", 9600);
//!     let mut gauge = GaugeController::open_serial(config, Channels::Dual)?;
//!
//!     let reading = gauge.read_gauge(1)?;
//!     println!("{:e} mbar ({})", reading.value, reading.status_text());
//!
//!     gauge.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::AppConfig;
pub use crate::core::controller::{Channels, GaugeController};
pub use crate::core::gauge::{PressureGauge, SharedGauge};
pub use crate::core::history::{Sample, SampleWindow};
pub use crate::core::logger::{LogEntry, LogFormat, SampleLogger};
pub use crate::core::protocol::{Command, Gauge, ProtocolError};
pub use crate::core::reading::{DualReading, GaugeIdentity, Reading};
pub use crate::core::simulator::{SimulatedGauge, SimulatorConfig, VirtualDevice};
pub use crate::core::status::{GaugeId, MeasurementStatus, PressureUnit};
pub use crate::core::transport::{SerialConfig, Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
