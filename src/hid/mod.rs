//! USB HID control port of the reference board.
//!
//! The board's MCU exposes a vendor-specific HID interface that accepts a
//! short text command per output report and answers with one input report.
//! This module scans every matching device, sends the command and tallies
//! per-device failures; [`power`] builds the hard-reset sequence on top.
//!
//! The real backend wraps `hidapi` and is only compiled with the `hidraw`
//! feature; [`MockHidBackend`] stands in for it in tests.

pub mod error;
pub mod mock;
pub mod power;
pub mod report;
pub mod sender;
pub mod tool;
pub mod traits;

#[cfg(feature = "hidraw")]
pub mod hidapi_backend;

use std::time::Duration;

pub use error::HidError;
pub use mock::{MockDevice, MockHidBackend, MockHidStats};
pub use power::{HardReset, HidPowerCycler, LocalHardReset, PowerCycleTimings};
pub use report::{decode_response, HidReport, RECV_SIZE, SEND_SIZE};
pub use sender::{DeviceOutcome, FailureStage, HidCommandSender, ScanReport};
pub use traits::{HidBackend, HidDeviceEntry, HidHandle};

#[cfg(feature = "hidraw")]
pub use hidapi_backend::HidApiBackend;

/// USB vendor ID of the board's control port.
pub const VENDOR_ID: u16 = 0x0416;

/// USB product ID of the board's control port.
pub const PRODUCT_ID: u16 = 0xC145;

/// How long to wait for the response report of one device.
pub const READ_TIMEOUT: Duration = Duration::from_millis(10_000);
