//! Core module containing the instrument communication layer
//!
//! This module provides:
//! - Transport layer (serial port, scripted byte streams)
//! - Framing protocol with ACK/NAK and ENQ data retrieval
//! - Explicit exchange state machine
//! - Command set for TPG 261 / TPG 262 controllers
//! - Measurement status, gauge id and unit tables
//! - Simulated controllers (in-process peer and wire-level virtual device)
//! - Rolling sample history and sample logging for the monitor

pub mod controller;
pub mod gauge;
pub mod history;
pub mod logger;
pub mod protocol;
pub mod reading;
pub mod simulator;
pub mod state_machine;
pub mod status;
pub mod transport;
