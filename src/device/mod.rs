//! Bluetooth reference device controllers.
//!
//! [`BluetoothReferenceDevice`] is what test code programs against;
//! [`BesDevice`] implements it for the BES dev board over its UART, and
//! [`registry`] builds controllers from test-bed entries.

pub mod base;
pub mod bes;
pub mod command;
pub mod error;
pub mod log_recorder;
pub mod registry;
pub mod response;
pub mod session;

pub use base::{BluetoothInfo, BluetoothReferenceDevice, PairedDevice, TwsBatteryLevel};
pub use bes::{BesDevice, BesOptions};
pub use command::{AccessMode, AncMode, BesCommand, BoxState};
pub use error::{DeviceError, DeviceResult};
pub use log_recorder::LogRecorder;
pub use registry::{ControllerRegistry, DeviceBox, RegistryError};
pub use response::{BesResponse, ErrorType, LogLine, LogLineParser, ResponseCollector};
pub use session::{BoardSession, CommandTimings};
