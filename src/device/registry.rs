//! Factory for reference-device controllers.
//!
//! Test beds list reference devices under `BluetoothReferenceDevice`; each
//! entry names its controller in `controller_name` and the remaining keys
//! configure that controller.

use super::base::BluetoothReferenceDevice;
use super::bes::{BesDevice, BesOptions, CONTROLLER_NAME as BES_CONTROLLER};
use super::error::{DeviceError, DeviceResult};
use crate::config::{DeviceConfig, RawDeviceConfig};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

/// A controller of any supported kind.
pub type DeviceBox = Box<dyn BluetoothReferenceDevice>;

/// Builds a controller from its validated config.
pub type Constructor = Box<dyn Fn(DeviceConfig) -> DeviceResult<DeviceBox>>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Configuration is empty, abort!")]
    EmptyConfig,

    #[error("Missing required key `controller_name` in config!")]
    MissingControllerName,

    #[error("Device class {0} is not supported.")]
    DeviceNotSupported(String),

    #[error("Failed to create Bluetooth reference device class `{controller}`: {source}")]
    Creation {
        controller: String,
        #[source]
        source: DeviceError,
    },
}

/// Known controllers by name.
pub struct ControllerRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl ControllerRegistry {
    /// A registry without any controller.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry with the built-in controllers.
    pub fn with_defaults(options: BesOptions) -> Self {
        let mut registry = Self::empty();
        registry.register(BES_CONTROLLER, move |config| {
            Ok(Box::new(BesDevice::open(config, options.clone())?) as DeviceBox)
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(DeviceConfig) -> DeviceResult<DeviceBox> + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build one controller per entry, in order.
    ///
    /// Every entry is checked before anything is built; a failure while
    /// building drops (and so closes) the controllers built so far.
    pub fn create(&self, configs: &[RawDeviceConfig]) -> Result<Vec<DeviceBox>, RegistryError> {
        if configs.is_empty() {
            return Err(RegistryError::EmptyConfig);
        }

        let mut plan = Vec::with_capacity(configs.len());
        for raw in configs {
            debug!(config = ?raw, "create Bluetooth reference device from config");
            let name = raw
                .get("controller_name")
                .and_then(|v| v.as_str())
                .ok_or(RegistryError::MissingControllerName)?;
            let constructor = self
                .constructors
                .get(name)
                .ok_or_else(|| RegistryError::DeviceNotSupported(name.to_string()))?;
            plan.push((name, constructor, raw));
        }

        plan.into_iter()
            .map(|(name, constructor, raw)| {
                DeviceConfig::from_raw(raw)
                    .map_err(DeviceError::from)
                    .and_then(|config| constructor(config))
                    .map_err(|source| RegistryError::Creation {
                        controller: name.to_string(),
                        source,
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}

/// Tear every device down; failures are logged, never returned.
pub fn destroy(devices: &mut [DeviceBox]) {
    for device in devices.iter_mut() {
        if let Err(e) = device.destroy() {
            error!(device = %device.debug_tag(), error = %e, "Failed to clean up device properly");
        }
    }
}

/// One info map per device, in order.
pub fn get_info(devices: &[DeviceBox]) -> Vec<BTreeMap<String, String>> {
    devices.iter().map(|d| d.get_info()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(yaml: &str) -> RawDeviceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_empty_config_list() {
        let registry = ControllerRegistry::with_defaults(BesOptions::default());
        let err = registry.create(&[]).err().expect("empty list must fail");
        assert_eq!(err.to_string(), "Configuration is empty, abort!");
    }

    #[test]
    fn test_controller_name_required() {
        let registry = ControllerRegistry::with_defaults(BesOptions::default());
        let err = registry
            .create(&[raw("serial_port: /dev/null\nbluetooth_address: '11:22:33:44:55:66'\n")])
            .err()
            .expect("create must fail");
        assert!(matches!(err, RegistryError::MissingControllerName));
    }

    #[test]
    fn test_unknown_controller_checked_before_building() {
        let registry = ControllerRegistry::with_defaults(BesOptions::default());
        let err = registry
            .create(&[
                raw("controller_name: BesDevice\nserial_port: /dev/does-not-exist\nbluetooth_address: '11:22:33:44:55:66'\n"),
                raw("controller_name: TwsDevice\n"),
            ])
            .err()
            .expect("create must fail");
        assert_eq!(err.to_string(), "Device class TwsDevice is not supported.");
    }

    #[test]
    fn test_invalid_entry_reports_controller() {
        let registry = ControllerRegistry::with_defaults(BesOptions::default());
        let err = registry
            .create(&[raw("controller_name: BesDevice\nserial_port: p\nbluetooth_address: nope\n")])
            .err()
            .expect("create must fail");
        match err {
            RegistryError::Creation { controller, source } => {
                assert_eq!(controller, "BesDevice");
                assert!(matches!(source, DeviceError::Config(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(registry.supported().collect::<Vec<_>>(), vec!["BesDevice"]);
    }
}
