//! Harness configuration schema.
//!
//! Every section has defaults, so an empty file (or no file) is valid.

use crate::device::session::CommandTimings;
use crate::hid::tool::ToolOptions;
use crate::hid::{LocalHardReset, PowerCycleTimings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Serial link to the board
    pub serial: SerialConfig,
    /// Board command timings
    pub board: BoardConfig,
    /// HID control port
    pub hid: HidConfig,
    /// Directory for board logs; a temp directory when unset
    pub log_dir: Option<PathBuf>,
}

impl HarnessConfig {
    /// Where board log files are written.
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("bt-ref-logs"))
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate of the board UART
    pub baud_rate: u32,
    /// Read timeout of one poll in milliseconds
    pub read_timeout_ms: u64,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: crate::port::BOARD_BAUD_RATE,
            read_timeout_ms: 50,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Board command timing section, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub command_interval_ms: u64,
    pub reboot_settle_ms: u64,
    pub execution_timeout_ms: u64,
    pub reboot_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let timings = CommandTimings::default();
        Self {
            command_interval_ms: timings.command_interval.as_millis() as u64,
            reboot_settle_ms: timings.reboot_settle.as_millis() as u64,
            execution_timeout_ms: timings.execution_timeout.as_millis() as u64,
            reboot_timeout_ms: timings.reboot_timeout.as_millis() as u64,
            poll_interval_ms: timings.poll_interval.as_millis() as u64,
        }
    }
}

impl BoardConfig {
    pub fn timings(&self) -> CommandTimings {
        CommandTimings {
            command_interval: Duration::from_millis(self.command_interval_ms),
            reboot_settle: Duration::from_millis(self.reboot_settle_ms),
            execution_timeout: Duration::from_millis(self.execution_timeout_ms),
            reboot_timeout: Duration::from_millis(self.reboot_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// HID control port section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub read_timeout_ms: u64,
    /// MCU firmware accepted by the hard reset
    pub stable_mcu_version: String,
    pub after_version_check_secs: u64,
    pub after_power_on_secs: u64,
    pub after_reboot_secs: u64,
}

impl Default for HidConfig {
    fn default() -> Self {
        let waits = PowerCycleTimings::default();
        Self {
            vendor_id: crate::hid::VENDOR_ID,
            product_id: crate::hid::PRODUCT_ID,
            read_timeout_ms: crate::hid::READ_TIMEOUT.as_millis() as u64,
            stable_mcu_version: crate::hid::power::STABLE_MCU_VERSION.to_string(),
            after_version_check_secs: waits.after_version_check.as_secs(),
            after_power_on_secs: waits.after_power_on.as_secs(),
            after_reboot_secs: waits.after_reboot.as_secs(),
        }
    }
}

impl HidConfig {
    pub fn tool_options(&self) -> ToolOptions {
        ToolOptions {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn power_timings(&self) -> PowerCycleTimings {
        PowerCycleTimings {
            after_version_check: Duration::from_secs(self.after_version_check_secs),
            after_power_on: Duration::from_secs(self.after_power_on_secs),
            after_reboot: Duration::from_secs(self.after_reboot_secs),
        }
    }

    /// Hard reset of the locally attached boards with these settings.
    pub fn local_hard_reset(&self) -> LocalHardReset {
        LocalHardReset {
            options: self.tool_options(),
            timings: self.power_timings(),
            stable_version: self.stable_mcu_version.clone(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Log format: "pretty", "compact", "full"
    pub format: LogFormat,
    /// Colored output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            ansi: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// Single line, abbreviated
    Compact,
    /// Single line with all fields
    #[default]
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.serial.baud_rate, 1_152_000);
        assert_eq!(config.board.execution_timeout_ms, 10_000);
        assert_eq!(config.hid.vendor_id, 0x0416);
        assert_eq!(config.hid.stable_mcu_version, "V1.0.3");
        assert_eq!(config.board.timings(), CommandTimings::default());
        assert_eq!(config.hid.power_timings(), PowerCycleTimings::default());
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("left-bud".to_string(), "/dev/ttyUSB0".to_string());

        assert_eq!(config.resolve_port("left-bud"), "/dev/ttyUSB0");
        assert_eq!(config.resolve_port("/dev/ttyUSB3"), "/dev/ttyUSB3");
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&HarnessConfig::default()).unwrap();
        assert!(toml_str.contains("[board]"));
        assert!(toml_str.contains("[hid]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            log_dir = "/var/log/bt-ref"

            [board]
            execution_timeout_ms = 2500

            [logging]
            format = "compact"
        "#;

        let config: HarnessConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.board.timings().execution_timeout, Duration::from_millis(2500));
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.resolved_log_dir(), PathBuf::from("/var/log/bt-ref"));
        // Defaults should still work
        assert_eq!(config.board.reboot_timeout_ms, 30_000);
    }
}
