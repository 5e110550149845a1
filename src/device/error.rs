//! Controller error types.

use super::response::ErrorType;
use crate::address::AddressError;
use crate::config::ConfigError;
use crate::hid::HidError;
use crate::port::PortError;
use thiserror::Error;

/// Errors raised by reference-device controllers.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The serial link failed.
    #[error("Serial link error: {0}")]
    Port(#[from] PortError),

    /// Writing the board log failed.
    #[error("Board log I/O error: {0}")]
    LogIo(#[from] std::io::Error),

    #[error(transparent)]
    Address(#[from] AddressError),

    /// An argument was outside what the board accepts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The board did not answer a command in time.
    #[error("Failed to wait for response of the command: {0}")]
    CommandTimeout(String),

    /// The board answered with a non-zero error code.
    #[error("Command execution failed on the board. Command: {command}. Error type: {error_type}")]
    CommandFailed { command: String, error_type: ErrorType },

    /// The board misbehaved (unexpected output, wrong state, missed reboot).
    #[error("{0}")]
    Runtime(String),

    /// Nothing was printed by the board after the link came up.
    #[error("No log output from the board. Please power on the board by pressing the `PWR` and `RST` button.")]
    NoLogOutput,

    /// The controller does not implement this capability.
    #[error("`{0}` is not supported by this device")]
    NotSupported(&'static str),

    /// The device entry of the test bed is invalid.
    #[error("Failed to parse device config: {0}")]
    Config(#[from] ConfigError),

    /// Hard reset over HID failed.
    #[error("Hard reset failed: {0}")]
    HardReset(#[from] HidError),
}

impl DeviceError {
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Errors after which re-sending the same command may help.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::CommandTimeout(_) | Self::CommandFailed { .. })
    }
}

/// Result type for controller operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
