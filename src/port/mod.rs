//! Port abstraction layer for the board's serial link.
//!
//! Provides the `SerialPortAdapter` trait with a `serialport`-backed
//! implementation and an in-memory mock, so the board controller can be
//! driven against real hardware or scripted log output.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::*;
pub use traits::*;
