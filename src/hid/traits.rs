//! Backend traits for HID access.
//!
//! The sender only needs enumeration by VID/PID, open-by-path and one
//! write/read pair per device. Dropping a handle closes the device.

use super::error::HidError;
use serde::Serialize;
use std::time::Duration;

/// One enumerated HID device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HidDeviceEntry {
    /// Platform path used to open the device (e.g. `/dev/hidraw3`).
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl HidDeviceEntry {
    /// Entry with only a path and IDs, as mocks and tests build them.
    pub fn new(path: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            path: path.into(),
            vendor_id,
            product_id,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

/// An open HID device.
pub trait HidHandle {
    /// Send one output report, returning the number of bytes written.
    fn write_report(&mut self, report: &[u8]) -> Result<usize, HidError>;

    /// Wait up to `timeout` for one input report.
    ///
    /// Returns the number of bytes read; zero means nothing arrived.
    fn read_report(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, HidError>;
}

/// Access to the host's HID devices.
pub trait HidBackend {
    /// List devices matching `vendor_id`/`product_id`.
    fn enumerate(&mut self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceEntry>, HidError>;

    /// Open an enumerated device by path.
    fn open(&mut self, entry: &HidDeviceEntry) -> Result<Box<dyn HidHandle>, HidError>;
}

impl<B: HidBackend + ?Sized> HidBackend for &mut B {
    fn enumerate(&mut self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceEntry>, HidError> {
        (**self).enumerate(vendor_id, product_id)
    }

    fn open(&mut self, entry: &HidDeviceEntry) -> Result<Box<dyn HidHandle>, HidError> {
        (**self).open(entry)
    }
}
