//! HID error types.

use thiserror::Error;

/// Errors from the HID backend or from report framing.
#[derive(Debug, Error)]
pub enum HidError {
    /// The HID library could not be initialised.
    #[error("HID initialisation failed: {0}")]
    Init(String),

    /// Enumerating devices failed.
    #[error("HID enumeration failed: {0}")]
    Enumerate(String),

    /// A device could not be opened.
    #[error("Unable to open device {path}: {message}")]
    Open { path: String, message: String },

    /// Writing the output report failed.
    #[error("HID write failed: {0}")]
    Write(String),

    /// Reading the input report failed.
    #[error("HID read failed: {0}")]
    Read(String),

    /// No input report arrived before the timeout.
    #[error("No response within {0:?}")]
    Timeout(std::time::Duration),

    /// The command cannot be framed into one output report.
    #[error("Command rejected: {0}")]
    InvalidCommand(String),

    /// At least one device failed during a scan that had to succeed.
    #[error("HID command '{command}' failed on {failed} device(s)")]
    ScanFailed { command: String, failed: usize },

    /// The control MCU runs firmware other than the known stable build.
    #[error("Current MCU version {found} is not a stable version. Please flash the MCU firmware to the stable version {expected}.")]
    UnstableMcuVersion { found: String, expected: String },
}

impl HidError {
    /// Create an Open error for a device path.
    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }
}
