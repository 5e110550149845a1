//! YAML test-bed files.
//!
//! ```yaml
//! TestBeds:
//! - Name: SampleTestBed
//!   Controllers:
//!     AndroidDevice: '*'
//!     BluetoothReferenceDevice:
//!     - controller_name: BesDevice
//!       serial_port: '/dev/ttyUSB0'
//!       bluetooth_address: '11:22:33:44:55:66'
//!       enable_hard_reset: 'true'
//!       dimensions:
//!         mode: headset
//!   TestParams:
//!     pairing_timeout: 30
//! ```

use super::error::{ConfigError, ConfigResult};
use crate::address::is_valid_address;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// One reference-device entry exactly as written in the test bed.
pub type RawDeviceConfig = Mapping;

/// Root of a test-bed file.
#[derive(Debug, Clone, Deserialize)]
pub struct TestBedFile {
    #[serde(rename = "TestBeds")]
    pub test_beds: Vec<TestBed>,
    #[serde(rename = "MoblyParams", default)]
    pub params: Mapping,
}

impl TestBedFile {
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Test bed by name, or the first one when `name` is `None`.
    pub fn test_bed(&self, name: Option<&str>) -> ConfigResult<&TestBed> {
        match name {
            Some(name) => self
                .test_beds
                .iter()
                .find(|bed| bed.name == name)
                .ok_or_else(|| ConfigError::validation("TestBeds", format!("no test bed named '{name}'"))),
            None => self.test_beds.first().ok_or(ConfigError::Empty),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestBed {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Controllers", default)]
    pub controllers: Controllers,
    #[serde(rename = "TestParams", default)]
    pub test_params: Mapping,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Controllers {
    #[serde(rename = "AndroidDevice", default)]
    pub android_devices: AndroidDevices,
    /// Entries with a `controller_name`, dispatched by the registry.
    #[serde(rename = "BluetoothReferenceDevice", default)]
    pub reference_devices: Vec<RawDeviceConfig>,
    /// Entries for the BES controller directly.
    #[serde(rename = "BesDevice", default)]
    pub bes_devices: Vec<RawDeviceConfig>,
}

/// Which Android devices a test bed uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum AndroidDevices {
    #[default]
    None,
    /// `'*'`: every attached device.
    All,
    Serials(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAndroidDevices {
    Wildcard(String),
    List(Vec<RawAndroidDevice>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAndroidDevice {
    Serial(String),
    Detailed { serial: String },
}

impl<'de> Deserialize<'de> for AndroidDevices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawAndroidDevices::deserialize(deserializer)? {
            RawAndroidDevices::Wildcard(s) if s == "*" => Ok(Self::All),
            RawAndroidDevices::Wildcard(s) => Err(serde::de::Error::custom(format!(
                "AndroidDevice must be '*' or a list, got '{s}'"
            ))),
            RawAndroidDevices::List(list) => Ok(Self::Serials(
                list.into_iter()
                    .map(|device| match device {
                        RawAndroidDevice::Serial(serial) | RawAndroidDevice::Detailed { serial } => serial,
                    })
                    .collect(),
            )),
        }
    }
}

/// Validated configuration of one reference device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceConfig {
    /// Set for registry entries; names the controller to build.
    pub controller_name: Option<String>,
    pub serial_port: String,
    pub bluetooth_address: String,
    /// Drive the UART through shell tools instead of the serial driver.
    pub shell_mode: bool,
    /// Power-cycle the board over HID when it cannot be initialised.
    pub enable_hard_reset: bool,
    /// Free-form per-device settings used to filter devices in tests.
    pub dimensions: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawFields {
    controller_name: Option<String>,
    serial_port: String,
    bluetooth_address: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    shell_mode: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    enable_hard_reset: bool,
    #[serde(default)]
    dimensions: BTreeMap<String, Value>,
}

/// Accept YAML booleans and the strings "true"/"false" in any case.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(serde::de::Error::custom(format!("Invalid value for bool: {other:?}"))),
    }
}

const REQUIRED_KEYS: [&str; 2] = ["serial_port", "bluetooth_address"];

impl DeviceConfig {
    /// Parse and validate one raw entry.
    ///
    /// Unknown keys are ignored. Shell mode and hard reset only work on
    /// Linux and are switched off elsewhere.
    pub fn from_raw(raw: &RawDeviceConfig) -> ConfigResult<Self> {
        tracing::debug!(config = ?raw, "parsing device config");
        for key in REQUIRED_KEYS {
            if !raw.contains_key(key) {
                return Err(ConfigError::MissingRequired(format!(
                    "Missing required key in config: {key}"
                )));
            }
        }

        let fields: RawFields = serde_yaml::from_value(Value::Mapping(raw.clone()))
            .map_err(|e| ConfigError::validation("device", format!("Invalid value in config: {e}")))?;

        if !is_valid_address(&fields.bluetooth_address) {
            return Err(ConfigError::validation(
                "bluetooth_address",
                format!("Invalid Bluetooth address: {}", fields.bluetooth_address),
            ));
        }

        let linux = cfg!(target_os = "linux");
        Ok(Self {
            controller_name: fields.controller_name,
            serial_port: fields.serial_port,
            bluetooth_address: fields.bluetooth_address,
            shell_mode: fields.shell_mode && linux,
            enable_hard_reset: fields.enable_hard_reset && linux,
            dimensions: fields.dimensions,
        })
    }

    /// Parse a whole list; an empty list is an error.
    pub fn from_raw_list(raw: &[RawDeviceConfig]) -> ConfigResult<Vec<Self>> {
        if raw.is_empty() {
            return Err(ConfigError::Empty);
        }
        raw.iter().map(Self::from_raw).collect()
    }

    /// Look a key up in the named fields first, then in `dimensions`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "controller_name" => self.controller_name.clone().map(Value::String),
            "serial_port" => Some(Value::String(self.serial_port.clone())),
            "bluetooth_address" => Some(Value::String(self.bluetooth_address.clone())),
            "shell_mode" => Some(Value::Bool(self.shell_mode)),
            "enable_hard_reset" => Some(Value::Bool(self.enable_hard_reset)),
            _ => self.dimensions.get(key).cloned(),
        }
    }

    /// [`get`](Self::get) with a fallback.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(yaml: &str) -> RawDeviceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_minimal_device() {
        let config = DeviceConfig::from_raw(&raw(
            "serial_port: /dev/ttyUSB0\nbluetooth_address: '11:22:33:44:55:66'\n",
        ))
        .unwrap();

        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert!(!config.shell_mode);
        assert!(!config.enable_hard_reset);
        assert!(config.dimensions.is_empty());
        assert_eq!(config.controller_name, None);
    }

    #[test]
    fn test_lenient_booleans() {
        let config = DeviceConfig::from_raw(&raw(
            "serial_port: p\nbluetooth_address: 'AA:BB:CC:DD:EE:FF'\nshell_mode: 'FALSE'\nenable_hard_reset: 'True'\n",
        ))
        .unwrap();
        assert!(!config.shell_mode);
        assert_eq!(config.enable_hard_reset, cfg!(target_os = "linux"));

        let err = DeviceConfig::from_raw(&raw(
            "serial_port: p\nbluetooth_address: 'AA:BB:CC:DD:EE:FF'\nshell_mode: 'yes'\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = DeviceConfig::from_raw(&raw("serial_port: p\nbluetooth_address: '11:22:33'\n")).unwrap_err();
        assert!(err.to_string().contains("Invalid Bluetooth address: 11:22:33"));
    }

    #[test]
    fn test_missing_key_and_empty_list() {
        let err = DeviceConfig::from_raw(&raw("serial_port: p\n")).unwrap_err();
        assert!(err.to_string().contains("bluetooth_address"));

        let err = DeviceConfig::from_raw_list(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Configuration is empty, abort!");
    }

    #[test]
    fn test_get_prefers_fields_over_dimensions() {
        let config = DeviceConfig::from_raw(&raw(
            "serial_port: p\nbluetooth_address: '11:22:33:44:55:66'\ndimensions:\n  mode: headset\n  serial_port: shadowed\n",
        ))
        .unwrap();

        assert_eq!(config.get("serial_port"), Some(Value::String("p".into())));
        assert_eq!(config.get("mode"), Some(Value::String("headset".into())));
        assert_eq!(config.get("absent"), None);
        assert_eq!(config.get_or("absent", Value::from(3)), Value::from(3));
    }

    #[test]
    fn test_android_device_forms() {
        let file = TestBedFile::from_yaml(
            r#"
TestBeds:
- Name: wildcard
  Controllers:
    AndroidDevice: '*'
- Name: strings
  Controllers:
    AndroidDevice: [SERIAL1, SERIAL2]
- Name: maps
  Controllers:
    AndroidDevice:
    - serial: SERIAL3
      label: phone
"#,
        )
        .unwrap();

        let devices: Vec<_> = file
            .test_beds
            .iter()
            .map(|bed| bed.controllers.android_devices.clone())
            .collect();
        assert_eq!(
            devices,
            vec![
                AndroidDevices::All,
                AndroidDevices::Serials(vec!["SERIAL1".into(), "SERIAL2".into()]),
                AndroidDevices::Serials(vec!["SERIAL3".into()]),
            ]
        );

        let err = TestBedFile::from_yaml("TestBeds:\n- Name: x\n  Controllers:\n    AndroidDevice: all\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlError(_)));
    }

    #[test]
    fn test_select_test_bed() {
        let file = TestBedFile::from_yaml(
            "TestBeds:\n- Name: a\n- Name: b\n  TestParams:\n    rounds: 3\n",
        )
        .unwrap();

        assert_eq!(file.test_bed(None).unwrap().name, "a");
        let b = file.test_bed(Some("b")).unwrap();
        assert_eq!(b.test_params.get("rounds"), Some(&Value::from(3)));
        assert_eq!(b.controllers.android_devices, AndroidDevices::None);
        assert!(file.test_bed(Some("c")).is_err());
    }
}
