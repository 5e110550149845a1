//! Single-pass command scan over every matching HID device.

use super::error::HidError;
use super::report::{decode_response, HidReport, RECV_SIZE};
use super::traits::{HidBackend, HidDeviceEntry};
use super::{PRODUCT_ID, READ_TIMEOUT, VENDOR_ID};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Step of the open/write/read cycle at which a device failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Open,
    Write,
    Read,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// What happened to one device during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceOutcome {
    pub device: HidDeviceEntry,
    /// Bytes accepted by the write, if it happened.
    pub bytes_written: Option<usize>,
    /// Reply text, present on success.
    pub response: Option<String>,
    /// Failing step and its message, present on failure.
    pub failure: Option<(FailureStage, String)>,
}

impl DeviceOutcome {
    fn new(device: HidDeviceEntry) -> Self {
        Self {
            device,
            bytes_written: None,
            response: None,
            failure: None,
        }
    }

    fn failed(mut self, stage: FailureStage, error: &HidError) -> Self {
        self.failure = Some((stage, error.to_string()));
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of sending one command to every matching device.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub command: String,
    pub outcomes: Vec<DeviceOutcome>,
}

impl ScanReport {
    /// Number of devices that failed to open, write or read.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit status: 0 when every device succeeded (or none matched).
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Replies of the devices that answered.
    pub fn responses(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| o.response.as_deref())
    }
}

/// Sends one text command to every HID device with the board's IDs.
///
/// Devices are handled strictly one after another: open, write, read,
/// close. A failure on one device is recorded and the scan moves on.
pub struct HidCommandSender<B> {
    backend: B,
    vendor_id: u16,
    product_id: u16,
    read_timeout: Duration,
}

impl<B: HidBackend> HidCommandSender<B> {
    /// Sender for the board's default IDs and read timeout.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Target a different vendor/product pair.
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send `command` to every matching device.
    ///
    /// Only framing and enumeration errors abort the scan; everything
    /// per-device lands in the returned report.
    pub fn send(&mut self, command: &str) -> Result<ScanReport, HidError> {
        let report = HidReport::encode(command)?;
        let devices = self.backend.enumerate(self.vendor_id, self.product_id)?;
        info!(
            command,
            devices = devices.len(),
            "sending HID command to {:04x}:{:04x}",
            self.vendor_id,
            self.product_id
        );

        let outcomes = devices
            .into_iter()
            .map(|device| self.exchange(device, &report))
            .collect();

        Ok(ScanReport {
            command: command.to_string(),
            outcomes,
        })
    }

    fn exchange(&mut self, device: HidDeviceEntry, report: &HidReport) -> DeviceOutcome {
        let mut outcome = DeviceOutcome::new(device);
        let path = outcome.device.path.clone();

        let mut handle = match self.backend.open(&outcome.device) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(path = %path, error = %e, "unable to open HID device");
                return outcome.failed(FailureStage::Open, &e);
            }
        };

        match handle.write_report(report.as_bytes()) {
            Ok(written) => {
                debug!(path = %path, written, "HID write done");
                outcome.bytes_written = Some(written);
            }
            Err(e) => {
                warn!(path = %path, error = %e, "HID write failed");
                return outcome.failed(FailureStage::Write, &e);
            }
        }

        let mut buffer = [0u8; RECV_SIZE];
        match handle.read_report(&mut buffer, self.read_timeout) {
            Ok(0) => {
                let e = HidError::Timeout(self.read_timeout);
                warn!(path = %path, "HID device did not respond");
                outcome.failed(FailureStage::Read, &e)
            }
            Ok(len) => {
                let text = decode_response(&buffer, len);
                debug!(path = %path, len, response = %text, "HID read done");
                outcome.response = Some(text);
                outcome
            }
            Err(e) => {
                warn!(path = %path, error = %e, "HID read failed");
                outcome.failed(FailureStage::Read, &e)
            }
        }
        // `handle` drops here, closing the device.
    }
}
