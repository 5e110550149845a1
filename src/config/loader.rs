//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::HarnessConfig;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "BT_REF";

/// Config file name
const CONFIG_FILE_NAME: &str = "bt-ref.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "BT_REF_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: HarnessConfig,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `BT_REF_CONFIG` environment variable (explicit path)
    /// 2. `./bt-ref.toml` (current directory)
    /// 3. `bt-ref.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => HarnessConfig::default(),
        };
        apply_env_overrides(&mut config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = HarnessConfig::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> HarnessConfig {
        self.config
    }

    /// The effective configuration rendered as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(&self.config)?)
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Platform config directory, e.g. `~/.config/bt-ref` on Linux.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "bt-ref").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file path inside [`get_default_config_dir`].
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<HarnessConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(suffix: &str) -> (String, Option<String>) {
    let name = format!("{ENV_PREFIX}_{suffix}");
    let value = std::env::var(&name).ok();
    (name, value)
}

fn parse_env<T: FromStr>(suffix: &str, what: &str) -> ConfigResult<Option<T>> {
    match env_var(suffix) {
        (name, Some(value)) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}"))),
        (_, None) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `BT_REF_<SECTION>_<KEY>`
/// For example:
/// - `BT_REF_LOGGING_LEVEL=debug`
/// - `BT_REF_BOARD_EXECUTION_TIMEOUT_MS=20000`
/// - `BT_REF_HID_STABLE_MCU_VERSION=V1.0.4`
fn apply_env_overrides(config: &mut HarnessConfig) -> ConfigResult<()> {
    // Logging
    if let (_, Some(val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let (name, Some(val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }

    // Serial
    if let Some(val) = parse_env("SERIAL_BAUD_RATE", "baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = parse_env("SERIAL_READ_TIMEOUT_MS", "timeout")? {
        config.serial.read_timeout_ms = val;
    }

    // Board timings
    if let Some(val) = parse_env("BOARD_COMMAND_INTERVAL_MS", "interval")? {
        config.board.command_interval_ms = val;
    }
    if let Some(val) = parse_env("BOARD_EXECUTION_TIMEOUT_MS", "timeout")? {
        config.board.execution_timeout_ms = val;
    }
    if let Some(val) = parse_env("BOARD_REBOOT_TIMEOUT_MS", "timeout")? {
        config.board.reboot_timeout_ms = val;
    }

    // HID
    if let Some(val) = parse_env("HID_READ_TIMEOUT_MS", "timeout")? {
        config.hid.read_timeout_ms = val;
    }
    if let (_, Some(val)) = env_var("HID_STABLE_MCU_VERSION") {
        config.hid.stable_mcu_version = val;
    }

    if let (_, Some(val)) = env_var("LOG_DIR") {
        config.log_dir = Some(PathBuf::from(val));
    }

    Ok(())
}
