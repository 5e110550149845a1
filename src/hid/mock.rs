//! In-memory HID backend for tests.
//!
//! Each mock device has a scripted behaviour for open, write and read.
//! The backend counts opens, writes, reads and closes (handle drops) so
//! tests can assert on the exact I/O a scan performed.

use super::error::HidError;
use super::report::RECV_SIZE;
use super::traits::{HidBackend, HidDeviceEntry, HidHandle};
use super::{PRODUCT_ID, VENDOR_ID};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Scripted behaviour of one mock device.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub entry: HidDeviceEntry,
    pub fail_open: bool,
    pub fail_write: bool,
    pub fail_read: bool,
    /// Reply text; `None` makes the read time out with zero bytes.
    pub reply: Option<String>,
}

impl MockDevice {
    /// A matching device that answers every command with `reply`.
    pub fn responding(path: &str, reply: &str) -> Self {
        Self {
            entry: HidDeviceEntry::new(path, VENDOR_ID, PRODUCT_ID),
            fail_open: false,
            fail_write: false,
            fail_read: false,
            reply: Some(reply.to_string()),
        }
    }

    /// A matching device that cannot be opened.
    pub fn unopenable(path: &str) -> Self {
        Self {
            fail_open: true,
            ..Self::responding(path, "")
        }
    }

    /// A matching device whose writes fail.
    pub fn write_failing(path: &str) -> Self {
        Self {
            fail_write: true,
            ..Self::responding(path, "")
        }
    }

    /// A matching device whose reads fail.
    pub fn read_failing(path: &str) -> Self {
        Self {
            fail_read: true,
            ..Self::responding(path, "")
        }
    }

    /// A matching device that never answers.
    pub fn silent(path: &str) -> Self {
        Self {
            reply: None,
            ..Self::responding(path, "")
        }
    }

    /// Change the IDs so the device no longer matches the board.
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.entry.vendor_id = vendor_id;
        self.entry.product_id = product_id;
        self
    }
}

/// I/O counters shared by the backend and its handles.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MockHidStats {
    pub enumerations: usize,
    pub opens: usize,
    pub writes: usize,
    pub reads: usize,
    pub closes: usize,
    /// Every report written, in order.
    pub written: Vec<Vec<u8>>,
}

/// Mock HID backend.
#[derive(Debug, Clone, Default)]
pub struct MockHidBackend {
    devices: Vec<MockDevice>,
    fail_enumerate: bool,
    stats: Arc<Mutex<MockHidStats>>,
}

impl MockHidBackend {
    /// Backend exposing `devices`.
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            ..Default::default()
        }
    }

    /// Backend whose enumeration fails.
    pub fn failing_enumeration() -> Self {
        Self {
            fail_enumerate: true,
            ..Default::default()
        }
    }

    /// Snapshot of the I/O counters.
    pub fn stats(&self) -> MockHidStats {
        lock(&self.stats).clone()
    }

    /// Command text of every write, decoded from the reports.
    pub fn written_commands(&self) -> Vec<String> {
        lock(&self.stats)
            .written
            .iter()
            .map(|report| super::report::decode_response(report, report.len()))
            .collect()
    }
}

fn lock(stats: &Mutex<MockHidStats>) -> MutexGuard<'_, MockHidStats> {
    stats.lock().unwrap_or_else(|e| e.into_inner())
}

impl HidBackend for MockHidBackend {
    fn enumerate(&mut self, vendor_id: u16, product_id: u16) -> Result<Vec<HidDeviceEntry>, HidError> {
        if self.fail_enumerate {
            return Err(HidError::Enumerate("mock enumeration failure".to_string()));
        }
        lock(&self.stats).enumerations += 1;
        Ok(self
            .devices
            .iter()
            .filter(|d| d.entry.vendor_id == vendor_id && d.entry.product_id == product_id)
            .map(|d| d.entry.clone())
            .collect())
    }

    fn open(&mut self, entry: &HidDeviceEntry) -> Result<Box<dyn HidHandle>, HidError> {
        let device = self
            .devices
            .iter()
            .find(|d| d.entry.path == entry.path)
            .ok_or_else(|| HidError::open(&entry.path, "no such device"))?;
        if device.fail_open {
            return Err(HidError::open(&entry.path, "mock open failure"));
        }
        lock(&self.stats).opens += 1;
        Ok(Box::new(MockHandle {
            device: device.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockHandle {
    device: MockDevice,
    stats: Arc<Mutex<MockHidStats>>,
}

impl HidHandle for MockHandle {
    fn write_report(&mut self, report: &[u8]) -> Result<usize, HidError> {
        if self.device.fail_write {
            return Err(HidError::Write("mock write failure".to_string()));
        }
        let mut stats = lock(&self.stats);
        stats.writes += 1;
        stats.written.push(report.to_vec());
        Ok(report.len())
    }

    fn read_report(&mut self, buffer: &mut [u8], _timeout: Duration) -> Result<usize, HidError> {
        if self.device.fail_read {
            return Err(HidError::Read("mock read failure".to_string()));
        }
        lock(&self.stats).reads += 1;
        let Some(reply) = &self.device.reply else {
            return Ok(0);
        };
        let text = reply.as_bytes();
        let len = (text.len() + 2).min(buffer.len()).min(RECV_SIZE);
        buffer[..len].fill(0);
        let copy = text.len().min(len.saturating_sub(2));
        buffer[1..1 + copy].copy_from_slice(&text[..copy]);
        Ok(len)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        lock(&self.stats).closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_filters_ids() {
        let mut backend = MockHidBackend::new(vec![
            MockDevice::responding("/dev/hidraw0", "ok"),
            MockDevice::responding("/dev/hidraw1", "ok").with_ids(0x1234, 0x5678),
        ]);
        let found = backend.enumerate(VENDOR_ID, PRODUCT_ID).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/dev/hidraw0");
    }

    #[test]
    fn test_handle_drop_counts_close() {
        let mut backend = MockHidBackend::new(vec![MockDevice::responding("/dev/hidraw0", "ok")]);
        let entry = backend.enumerate(VENDOR_ID, PRODUCT_ID).unwrap().remove(0);
        {
            let _handle = backend.open(&entry).unwrap();
        }
        let stats = backend.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.closes, 1);
    }
}
