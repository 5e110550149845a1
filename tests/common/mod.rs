//! Shared test utilities for the harness integration tests.
//!
//! - board log line builders in the board's UART format
//! - mock ports scripted to boot and report a device identity
//! - device config and controller options builders
//! - a hard reset stand-in that counts calls

#![allow(dead_code)]

use bt_ref_harness::config::{DeviceConfig, RawDeviceConfig};
use bt_ref_harness::device::{BesDevice, BesOptions, CommandTimings, DeviceResult};
use bt_ref_harness::hid::{HardReset, HidError};
use bt_ref_harness::port::{MockSerialPort, PortAdapter, PortError};
use std::collections::VecDeque;
use std::path::Path;

pub const ADDRESS: &str = "11:22:33:44:55:66";
/// `ADDRESS` as the board prints it (LSB first, no colons).
pub const ADDRESS_LSB: &str = "665544332211";
pub const SERIAL_PORT: &str = "/dev/ttyMOCK0";

/// One formatted board log line, terminated like the UART does.
pub fn board_line(message: &str) -> String {
    format!("10516/R-M/I/MOBLY/ 10 | {message}\r\n")
}

/// A complete response: one line per data entry, then the status line.
pub fn response(data: &[&str], error_code: u32) -> String {
    let status = if error_code == 0 { "SUCCESS" } else { "FAIL" };
    let mut out: String = data
        .iter()
        .map(|d| board_line(&format!("[MOBLY_TEST]:{d}")))
        .collect();
    out.push_str(&board_line(&format!(
        "[MOBLY_TEST]:result: {status}, error_code={error_code}"
    )));
    out
}

pub fn success(data: &[&str]) -> String {
    response(data, 0)
}

/// The `get_device_info` answer for an address in board byte order.
pub fn device_info_reply(lsb_address: &str) -> String {
    success(&[
        &format!("bt_addr: {lsb_address}"),
        &format!("ble_addr: {lsb_address}"),
        "bt_name: Board L",
        "ble_name: Board LE",
    ])
}

/// What the board prints while rebooting into `access_mode`.
pub fn reboot_output(access_mode: u8) -> String {
    [
        "[SYS] REV_INFO=bes_fw_2.1.0",
        "[SYS] BUILD_DATE=Oct  1 2026 12:00:00",
        "[BT] bt_stack_init_done",
        &format!("[GAP] Access mode changed to {access_mode}"),
    ]
    .iter()
    .map(|m| board_line(m))
    .collect()
}

/// A port that has printed its boot banner and reports `lsb_address`.
pub fn booted_port(lsb_address: &str) -> MockSerialPort {
    let port = MockSerialPort::new(SERIAL_PORT);
    port.enqueue_read(board_line("[SYS] system boot").as_bytes());
    port.reply_to("mobly_test:get_device_info", &device_info_reply(lsb_address));
    port
}

/// Raw test-bed entry for the default board.
pub fn raw_config(extra: &str) -> RawDeviceConfig {
    let yaml = format!("serial_port: '{SERIAL_PORT}'\nbluetooth_address: '{ADDRESS}'\n{extra}");
    serde_yaml::from_str(&yaml).expect("valid device yaml")
}

pub fn device_config(extra: &str) -> DeviceConfig {
    DeviceConfig::from_raw(&raw_config(extra)).expect("valid device config")
}

/// Controller options writing logs under `log_dir` with test timings.
pub fn options(log_dir: &Path) -> BesOptions {
    BesOptions {
        log_dir: log_dir.to_path_buf(),
        timings: CommandTimings::immediate(),
        ..BesOptions::default()
    }
}

/// Hard reset stand-in.
#[derive(Debug, Default)]
pub struct FakeHardReset {
    pub calls: usize,
    pub fail: bool,
}

impl HardReset for FakeHardReset {
    fn hard_reset(&mut self) -> Result<(), HidError> {
        self.calls += 1;
        if self.fail {
            return Err(HidError::Init("no HID control port".to_string()));
        }
        Ok(())
    }
}

/// Hands out `ports` in order, one per connection attempt.
pub fn connector(ports: Vec<MockSerialPort>) -> impl FnMut(&str) -> Result<PortAdapter, PortError> {
    let mut ports: VecDeque<MockSerialPort> = ports.into();
    move |name| {
        ports
            .pop_front()
            .map(|port| Box::new(port) as PortAdapter)
            .ok_or_else(|| PortError::NotFound(name.to_string()))
    }
}

/// Open a controller on `port` with no hard reset available.
pub fn open_device(port: &MockSerialPort, log_dir: &Path) -> DeviceResult<BesDevice> {
    BesDevice::open_with(
        device_config(""),
        &options(log_dir),
        connector(vec![port.clone()]),
        &mut FakeHardReset::default(),
    )
}
