//! Top-level error type of the harness binaries.

use crate::config::ConfigError;
use crate::device::{DeviceError, RegistryError};
use crate::hid::HidError;
use thiserror::Error;

/// Any error the harness can report.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Hid(#[from] HidError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type of harness entry points.
pub type HarnessResult<T> = Result<T, HarnessError>;
