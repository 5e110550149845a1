//! Framing of command and response reports.
//!
//! Output reports are [`SEND_SIZE`] bytes: byte 0 is the report ID (always
//! zero, the control port does not number its reports), the command text
//! follows and is NUL-terminated, the rest is zero padding. Input reports
//! are [`RECV_SIZE`] bytes with the reply text starting at byte 1.

use super::error::HidError;

/// Size of an output (command) report, including the report ID byte.
pub const SEND_SIZE: usize = 65;

/// Size of an input (response) report buffer.
pub const RECV_SIZE: usize = 129;

/// Longest command that still leaves room for the terminator.
pub const MAX_COMMAND_LEN: usize = SEND_SIZE - 2;

/// A framed output report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidReport {
    bytes: [u8; SEND_SIZE],
    command_len: usize,
}

impl HidReport {
    /// Frame `command` into a zero-padded report.
    pub fn encode(command: &str) -> Result<Self, HidError> {
        let text = command.as_bytes();
        if text.contains(&0) {
            return Err(HidError::InvalidCommand(
                "command contains a NUL byte".to_string(),
            ));
        }
        if text.len() > MAX_COMMAND_LEN {
            return Err(HidError::InvalidCommand(format!(
                "command is {} bytes, at most {MAX_COMMAND_LEN} fit in one report",
                text.len()
            )));
        }

        let mut bytes = [0u8; SEND_SIZE];
        bytes[1..1 + text.len()].copy_from_slice(text);
        Ok(Self {
            bytes,
            command_len: text.len(),
        })
    }

    /// The full report as sent on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The command text carried by this report.
    pub fn command(&self) -> &str {
        // Constructed from a &str, so the slice is valid UTF-8.
        std::str::from_utf8(&self.bytes[1..1 + self.command_len]).unwrap_or_default()
    }
}

/// Extract the reply text from the first `len` bytes of an input report.
pub fn decode_response(buffer: &[u8], len: usize) -> String {
    let len = len.min(buffer.len());
    if len <= 1 {
        return String::new();
    }
    let payload = &buffer[1..len];
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}
