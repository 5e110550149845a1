//! Configuration: harness settings (TOML) and test beds (YAML).
//!
//! # Harness configuration resolution
//!
//! The harness configuration is loaded from the following locations (in
//! order of priority):
//!
//! 1. `BT_REF_CONFIG` environment variable (explicit path)
//! 2. `./bt-ref.toml` (current directory)
//! 3. `bt-ref.toml` in the platform config directory
//!    (`~/.config/bt-ref/` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Values can be overridden via environment variables following the
//! pattern `BT_REF_<SECTION>_<KEY>`:
//! - `BT_REF_LOGGING_LEVEL=debug`
//! - `BT_REF_BOARD_REBOOT_TIMEOUT_MS=60000`
//! - `BT_REF_LOG_DIR=/tmp/logs`
//!
//! # Example
//!
//! ```rust,no_run
//! use bt_ref_harness::config::{ConfigLoader, TestBedFile};
//!
//! let loader = ConfigLoader::load()?;
//! println!("Execution timeout: {:?}", loader.config().board.timings().execution_timeout);
//!
//! let file = TestBedFile::load("testbed.yaml")?;
//! let bed = file.test_bed(Some("SampleTestBed"))?;
//! println!("{} reference device(s)", bed.controllers.reference_devices.len());
//! # Ok::<(), bt_ref_harness::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;
mod testbed;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{BoardConfig, HarnessConfig, HidConfig, LogFormat, LoggingConfig, SerialConfig};
pub use testbed::{AndroidDevices, Controllers, DeviceConfig, RawDeviceConfig, TestBed, TestBedFile};
