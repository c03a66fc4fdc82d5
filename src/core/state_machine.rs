//! Exchange State Machine
//!
//! Every command follows the same request/acknowledge/enquiry pattern. The
//! machine makes the phase explicit so a data enquiry without a pending command,
//! or a second command while data is still pending, is caught before any I/O.

use crate::core::protocol::{Command, ProtocolError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Whether the serial handle is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleState {
    /// Port not open, commands fail with `NotConnected`
    Closed,
    /// Port open
    Open,
}

impl HandleState {
    /// Check if commands may be issued
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Phase of the current command exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeState {
    /// No command in flight
    Idle,
    /// Command frame written, waiting for ACK / NAK
    AwaitingAck,
    /// Acknowledged, data line may be enquired
    AwaitingData,
}

impl ExchangeState {
    /// Check if a new command frame may be written
    pub fn can_send(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a data enquiry is meaningful
    pub fn can_enquire(&self) -> bool {
        matches!(self, Self::AwaitingData)
    }
}

/// Recorded transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTransition {
    /// Previous state
    pub from: ExchangeState,
    /// New state
    pub to: ExchangeState,
    /// Command in flight when the transition happened
    pub command: Option<String>,
    /// Timestamp
    pub timestamp: DateTime<Local>,
}

/// Counters kept across exchanges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Command frames written
    pub commands: u64,
    /// Commands acknowledged
    pub acknowledged: u64,
    /// Data lines received
    pub data_lines: u64,
    /// Exchanges aborted by an error
    pub aborted: u64,
}

/// Exchange state machine
#[derive(Debug)]
pub struct ExchangeMachine {
    state: ExchangeState,
    last_command: Option<Command>,
    history: Vec<ExchangeTransition>,
    max_history: usize,
    stats: ExchangeStats,
}

impl Default for ExchangeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeMachine {
    /// Create a new, idle state machine
    pub fn new() -> Self {
        Self {
            state: ExchangeState::Idle,
            last_command: None,
            history: Vec::new(),
            max_history: 32,
            stats: ExchangeStats::default(),
        }
    }

    /// Get current state
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Command most recently started
    pub fn last_command(&self) -> Option<Command> {
        self.last_command
    }

    /// Recent transitions, oldest first
    pub fn history(&self) -> &[ExchangeTransition] {
        &self.history
    }

    /// Get counters
    pub fn stats(&self) -> ExchangeStats {
        self.stats
    }

    /// Start a command exchange
    pub fn begin(&mut self, command: Command) -> Result<(), ProtocolError> {
        self.transition(ExchangeState::AwaitingAck)?;
        self.last_command = Some(command);
        self.stats.commands += 1;
        Ok(())
    }

    /// Record the acknowledge; moves to `AwaitingData` when the command has a data phase
    pub fn acknowledged(&mut self) -> Result<(), ProtocolError> {
        let next = match self.last_command {
            Some(command) if command.expects_data() => ExchangeState::AwaitingData,
            _ => ExchangeState::Idle,
        };
        self.transition(next)?;
        self.stats.acknowledged += 1;
        Ok(())
    }

    /// Record a received data line
    pub fn data_received(&mut self) {
        self.stats.data_lines += 1;
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: ExchangeState) -> Result<(), ProtocolError> {
        if !self.is_valid_transition(new_state) {
            return Err(ProtocolError::OutOfSequence {
                from: self.state,
                to: new_state,
            });
        }

        self.history.push(ExchangeTransition {
            from: self.state,
            to: new_state,
            command: self.last_command.map(|c| c.to_string()),
            timestamp: Local::now(),
        });
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        self.state = new_state;
        Ok(())
    }

    fn is_valid_transition(&self, new_state: ExchangeState) -> bool {
        use ExchangeState::*;

        match (self.state, new_state) {
            (Idle, AwaitingAck) => true,
            (Idle, Idle) => true,

            // NAK, or a command without data phase
            (AwaitingAck, Idle) => true,
            (AwaitingAck, AwaitingData) => true,

            // Loopback test polls several lines
            (AwaitingData, AwaitingData) => true,
            (AwaitingData, Idle) => true,

            _ => false,
        }
    }

    /// Abort the exchange in flight, if any
    pub fn abort(&mut self) {
        if self.state != ExchangeState::Idle {
            self.stats.aborted += 1;
        }
        self.state = ExchangeState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::Gauge;

    #[test]
    fn test_full_exchange() {
        let mut machine = ExchangeMachine::new();
        machine.begin(Command::Pressure(Gauge::ONE)).unwrap();
        assert_eq!(machine.state(), ExchangeState::AwaitingAck);

        machine.acknowledged().unwrap();
        assert_eq!(machine.state(), ExchangeState::AwaitingData);

        machine.transition(ExchangeState::Idle).unwrap();
        assert_eq!(machine.history().len(), 3);
        assert_eq!(machine.stats().acknowledged, 1);
    }

    #[test]
    fn test_etx_has_no_data_phase() {
        let mut machine = ExchangeMachine::new();
        machine.begin(Command::EndOfText).unwrap();
        machine.acknowledged().unwrap();
        assert_eq!(machine.state(), ExchangeState::Idle);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut machine = ExchangeMachine::new();
        assert!(matches!(
            machine.transition(ExchangeState::AwaitingData),
            Err(ProtocolError::OutOfSequence {
                from: ExchangeState::Idle,
                to: ExchangeState::AwaitingData
            })
        ));

        machine.begin(Command::PressureBoth).unwrap();
        assert!(machine.begin(Command::PressureBoth).is_err());
    }

    #[test]
    fn test_abort_counts_only_in_flight() {
        let mut machine = ExchangeMachine::new();
        machine.abort();
        assert_eq!(machine.stats().aborted, 0);

        machine.begin(Command::PressureUnit).unwrap();
        machine.abort();
        assert_eq!(machine.state(), ExchangeState::Idle);
        assert_eq!(machine.stats().aborted, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = ExchangeMachine::new();
        for _ in 0..100 {
            machine.transition(ExchangeState::Idle).unwrap();
        }
        assert_eq!(machine.history().len(), 32);
    }
}
