//! Control bytes and CR LF framing
//!
//! Commands and replies are terminated by CR LF. The device answers every command
//! frame with a single ACK or NAK byte, itself framed with CR LF.

// ============ Control Bytes ============

/// End of text (Ctrl-C)
pub const ETX: u8 = 0x03;
/// Carriage return
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;
/// Enquiry, requests the pending data line
pub const ENQ: u8 = 0x05;
/// Acknowledge
pub const ACK: u8 = 0x06;
/// Negative acknowledge
pub const NAK: u8 = 0x15;

/// Acknowledge frame
pub const ACK_FRAME: [u8; 3] = [ACK, CR, LF];
/// Negative acknowledge frame
pub const NAK_FRAME: [u8; 3] = [NAK, CR, LF];

/// Append CR LF
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(payload.len() + 2);
    result.extend_from_slice(payload);
    result.extend_from_slice(&[CR, LF]);
    result
}

/// Remove one trailing LF and one trailing CR, in whichever order they arrived.
///
/// Driver buffering can deliver `\n\r` as well as `\r\n`; at most one of each is
/// stripped so payload bytes are never eaten.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    let (mut seen_lf, mut seen_cr) = (false, false);
    while end > 0 {
        match line[end - 1] {
            LF if !seen_lf => seen_lf = true,
            CR if !seen_cr => seen_cr = true,
            _ => break,
        }
        end -= 1;
    }
    &line[..end]
}

/// Remove every trailing occurrence of `byte`
pub fn strip_trailing(data: &[u8], byte: u8) -> &[u8] {
    let end = data.iter().rposition(|&b| b != byte).map_or(0, |i| i + 1);
    &data[..end]
}

/// How the device answered a command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// `ACK CR LF`
    Ack,
    /// `NAK CR LF`
    Nak,
    /// Anything else, kept verbatim
    Other(Vec<u8>),
}

/// Classify a line read after a command frame
pub fn classify(line: &[u8]) -> Acknowledgement {
    if line == NAK_FRAME {
        Acknowledgement::Nak
    } else if line == ACK_FRAME {
        Acknowledgement::Ack
    } else {
        Acknowledgement::Other(line.to_vec())
    }
}
