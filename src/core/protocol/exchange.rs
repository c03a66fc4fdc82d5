//! Acknowledge / enquiry exchange
//!
//! [`Exchange`] owns the transport and drives the two phases of every command:
//! the framed command with its ACK/NAK line, then the ENQ that fetches the data
//! line. Each step is checked against [`ExchangeMachine`]; any error returns the
//! machine to idle so the next command starts clean.

use super::framing::{self, Acknowledgement, ENQ, ETX};
use super::{Command, ProtocolError};
use crate::core::state_machine::{ExchangeMachine, ExchangeState};
use crate::core::transport::Transport;

/// Command/response driver over one transport
#[derive(Debug)]
pub struct Exchange<T> {
    transport: T,
    machine: ExchangeMachine,
}

impl<T: Transport> Exchange<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            machine: ExchangeMachine::new(),
        }
    }

    /// Get the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the transport mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Get the state machine
    pub fn machine(&self) -> &ExchangeMachine {
        &self.machine
    }

    /// Current exchange phase
    pub fn state(&self) -> ExchangeState {
        self.machine.state()
    }

    /// Write a command frame and check the acknowledge line.
    ///
    /// Data left pending by a previous command is abandoned.
    pub fn send_command(&mut self, command: Command) -> Result<(), ProtocolError> {
        if self.machine.state() == ExchangeState::AwaitingData {
            self.machine.transition(ExchangeState::Idle)?;
        }
        self.machine.begin(command)?;

        self.guarded(|transport, machine| {
            transport.write(&command.encode())?;
            let line = transport.read_line()?;
            match framing::classify(&line) {
                Acknowledgement::Ack => machine.acknowledged(),
                Acknowledgement::Nak => Err(ProtocolError::NegativeAcknowledge),
                Acknowledgement::Other(raw) => Err(ProtocolError::UnexpectedResponse(raw)),
            }
        })
    }

    /// Enquire the data line of the acknowledged command and finish the exchange
    pub fn poll_data(&mut self) -> Result<String, ProtocolError> {
        let raw = self.poll_raw()?;
        self.machine.transition(ExchangeState::Idle)?;
        if raw.is_empty() {
            return Err(ProtocolError::NoData);
        }
        String::from_utf8(raw).map_err(|e| ProtocolError::MalformedPayload(e.into_bytes()))
    }

    /// Enquire one line and strip its terminator, staying in the data phase
    pub fn poll_raw(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.expect_data_phase()?;
        self.guarded(|transport, machine| {
            transport.write(&[ENQ])?;
            let line = transport.read_line()?;
            machine.data_received();
            Ok(framing::strip_terminator(&line).to_vec())
        })
    }

    /// Write a bare ENQ without reading
    pub fn enquire(&mut self) -> Result<(), ProtocolError> {
        self.write_raw(&[ENQ])
    }

    /// Write bytes unframed during the data phase
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.expect_data_phase()?;
        self.guarded(|transport, _| Ok(transport.write(data)?))
    }

    /// Discard pending input, reading at most `limit` bytes.
    ///
    /// Stops at the first read that times out. Returns the number of bytes discarded.
    pub fn drain(&mut self, limit: usize) -> Result<usize, ProtocolError> {
        self.guarded(|transport, _| {
            let mut discarded = 0;
            while discarded < limit {
                match transport.read_byte()? {
                    Some(_) => discarded += 1,
                    None => break,
                }
            }
            Ok(discarded)
        })
    }

    /// Close the data phase without reading anything further
    pub fn finish(&mut self) -> Result<(), ProtocolError> {
        self.machine.transition(ExchangeState::Idle)
    }

    /// Send the framed ETX that ends the loopback test
    pub fn end_of_text(&mut self) -> Result<(), ProtocolError> {
        debug_assert_eq!(Command::EndOfText.mnemonic().as_bytes(), [ETX]);
        self.send_command(Command::EndOfText)
    }

    /// Abandon any exchange in flight
    pub fn reset(&mut self) {
        self.machine.abort();
    }

    fn expect_data_phase(&self) -> Result<(), ProtocolError> {
        if self.machine.state().can_enquire() {
            Ok(())
        } else {
            Err(ProtocolError::OutOfSequence {
                from: self.machine.state(),
                to: ExchangeState::AwaitingData,
            })
        }
    }

    fn guarded<R>(
        &mut self,
        step: impl FnOnce(&mut T, &mut ExchangeMachine) -> Result<R, ProtocolError>,
    ) -> Result<R, ProtocolError> {
        let result = step(&mut self.transport, &mut self.machine);
        if result.is_err() {
            self.machine.abort();
        }
        result
    }
}
