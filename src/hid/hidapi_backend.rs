//! HID backend on top of the `hidapi` crate.

use super::error::HidError;
use super::traits::{HidBackend, HidDeviceEntry, HidHandle};
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::time::Duration;

/// Host HID access through hidapi (hidraw on Linux).
pub struct HidApiBackend {
    api: HidApi,
}

impl HidApiBackend {
    /// Initialise hidapi without enumerating anything yet.
    pub fn new() -> Result<Self, HidError> {
        let api = HidApi::new_without_enumerate().map_err(|e| HidError::Init(e.to_string()))?;
        Ok(Self { api })
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&mut self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceEntry>, HidError> {
        self.api
            .reset_devices()
            .map_err(|e| HidError::Enumerate(e.to_string()))?;
        self.api
            .add_devices(vendor_id, product_id)
            .map_err(|e| HidError::Enumerate(e.to_string()))?;

        Ok(self
            .api
            .device_list()
            .map(|info| HidDeviceEntry {
                path: info.path().to_string_lossy().into_owned(),
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                manufacturer: info.manufacturer_string().map(str::to_string),
                product: info.product_string().map(str::to_string),
                serial_number: info.serial_number().map(str::to_string),
            })
            .collect())
    }

    fn open(&mut self, entry: &HidDeviceEntry) -> Result<Box<dyn HidHandle>, HidError> {
        let path = CString::new(entry.path.as_str())
            .map_err(|e| HidError::open(&entry.path, e.to_string()))?;
        let device = self
            .api
            .open_path(&path)
            .map_err(|e| HidError::open(&entry.path, e.to_string()))?;
        Ok(Box::new(HidApiHandle { device }))
    }
}

struct HidApiHandle {
    device: HidDevice,
}

impl HidHandle for HidApiHandle {
    fn write_report(&mut self, report: &[u8]) -> Result<usize, HidError> {
        self.device
            .write(report)
            .map_err(|e| HidError::Write(e.to_string()))
    }

    fn read_report(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, HidError> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buffer, millis)
            .map_err(|e| HidError::Read(e.to_string()))
    }
}
