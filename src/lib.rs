//! Hardware-in-the-loop harness for Bluetooth reference boards.
//!
//! # Modules
//!
//! - `config`: harness settings (TOML) and test-bed files (YAML)
//! - `device`: reference-device controllers and the BES board controller
//! - `hid`: USB HID control port, the `hidtool` scan and the hard reset
//! - `port`: serial port abstraction with a mock for tests
//! - `address`: Bluetooth address and Fast Pair parameter helpers
//! - `logging`: tracing setup for the binaries
//! - `error`: top-level error type

pub mod address;
pub mod config;
pub mod device;
pub mod error;
pub mod hid;
pub mod logging;
pub mod port;

pub use error::{HarnessError, HarnessResult};
pub use port::{
    DataBits, FlowControl, MockSerialPort, Parity, PortAdapter, PortConfiguration, PortError,
    SerialPortAdapter, StopBits, SyncSerialPort,
};

pub use config::{ConfigError, ConfigLoader, ConfigResult, DeviceConfig, HarnessConfig, TestBedFile};
pub use device::{BesDevice, BesOptions, BluetoothInfo, BluetoothReferenceDevice, ControllerRegistry, DeviceError};
