//! Helpers for the hardware tests.
//!
//! - `BT_REF_TEST_SERIAL_PORT`: UART of the board (required)
//! - `BT_REF_TEST_ADDRESS`: address the board should use (required)
//! - `BT_REF_TEST_HARD_RESET`: `1` to allow the HID power cycle

use bt_ref_harness::config::{DeviceConfig, RawDeviceConfig};
use serialport::{available_ports, SerialPortType};
use std::env;
use std::time::Instant;

pub struct TestBoardConfig {
    pub serial_port: String,
    pub bluetooth_address: String,
    pub hard_reset: bool,
}

impl TestBoardConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            serial_port: env::var("BT_REF_TEST_SERIAL_PORT").ok()?,
            bluetooth_address: env::var("BT_REF_TEST_ADDRESS").ok()?,
            hard_reset: env::var("BT_REF_TEST_HARD_RESET").ok().as_deref() == Some("1"),
        })
    }

    pub fn device_config(&self) -> DeviceConfig {
        let mut raw = RawDeviceConfig::new();
        raw.insert("serial_port".into(), self.serial_port.clone().into());
        raw.insert("bluetooth_address".into(), self.bluetooth_address.clone().into());
        raw.insert("enable_hard_reset".into(), self.hard_reset.into());
        DeviceConfig::from_raw(&raw).expect("BT_REF_TEST_ADDRESS must be XX:XX:XX:XX:XX:XX")
    }
}

pub fn print_available_ports() {
    let ports = available_ports().unwrap_or_default();
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return;
    }
    println!("Available serial ports ({}):", ports.len());
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(usb) => {
                println!("  {} (USB {:04x}:{:04x})", port.port_name, usb.vid, usb.pid)
            }
            _ => println!("  {}", port.port_name),
        }
    }
}

/// Prints the time a step took.
pub struct TimingHelper {
    label: String,
    start: Instant,
}

impl TimingHelper {
    pub fn new(label: &str) -> Self {
        println!("⏱️  {label}");
        Self {
            label: label.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        println!("✅ {} took {:?}", self.label, self.start.elapsed());
    }
}
