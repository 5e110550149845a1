//! Test-bed files end to end: YAML on disk, validation of the reference
//! device entries and controller creation through the registry.

mod common;

use bt_ref_harness::config::{AndroidDevices, ConfigError, DeviceConfig, TestBedFile};
use bt_ref_harness::device::{registry, BesDevice, ControllerRegistry, DeviceBox, RegistryError};
use common::*;
use std::io::Write;

const TESTBED: &str = r#"
TestBeds:
- Name: PairingBed
  Controllers:
    AndroidDevice:
    - serial: 1A2B3C
    - 4D5E6F
    BluetoothReferenceDevice:
    - controller_name: BesDevice
      serial_port: /dev/ttyUSB0
      bluetooth_address: '11:22:33:44:55:66'
      enable_hard_reset: 'False'
      dimensions:
        mode: headset
        tws: true
  TestParams:
    pairing_timeout: 30
- Name: AnyPhone
  Controllers:
    AndroidDevice: '*'
MoblyParams:
  LogPath: /tmp/logs
"#;

fn write_testbed(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_testbed_file() {
    let file = write_testbed(TESTBED);

    let testbeds = TestBedFile::load(file.path()).unwrap();

    assert_eq!(testbeds.test_beds.len(), 2);
    let bed = testbeds.test_bed(None).unwrap();
    assert_eq!(bed.name, "PairingBed");
    assert_eq!(
        bed.controllers.android_devices,
        AndroidDevices::Serials(vec!["1A2B3C".to_string(), "4D5E6F".to_string()])
    );
    assert_eq!(
        testbeds.test_bed(Some("AnyPhone")).unwrap().controllers.android_devices,
        AndroidDevices::All
    );
    assert!(testbeds.test_bed(Some("Missing")).is_err());

    let config = DeviceConfig::from_raw(&bed.controllers.reference_devices[0]).unwrap();
    assert_eq!(config.controller_name.as_deref(), Some("BesDevice"));
    assert!(!config.enable_hard_reset);
    assert_eq!(config.get("mode"), Some(serde_yaml::Value::String("headset".into())));
    assert_eq!(config.get("tws"), Some(serde_yaml::Value::Bool(true)));
    assert_eq!(config.get("serial_port"), Some(serde_yaml::Value::String("/dev/ttyUSB0".into())));
    assert_eq!(config.get("missing"), None);
}

#[test]
fn test_missing_testbed_file() {
    let err = TestBedFile::load("/nonexistent/testbed.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_invalid_entries_are_rejected() {
    let invalid_address = raw_config("").into_iter().map(|(k, v)| {
        if k.as_str() == Some("bluetooth_address") {
            (k, serde_yaml::Value::String("11:22:33:44:55".into()))
        } else {
            (k, v)
        }
    });
    let invalid_address: serde_yaml::Mapping = invalid_address.collect();
    assert!(DeviceConfig::from_raw(&invalid_address).is_err());

    let mut missing_port = raw_config("");
    missing_port.remove("serial_port");
    let err = DeviceConfig::from_raw(&missing_port).unwrap_err();
    assert!(err.to_string().contains("serial_port"));

    assert!(DeviceConfig::from_raw(&raw_config("shell_mode: maybe")).is_err());
    assert!(matches!(DeviceConfig::from_raw_list(&[]), Err(ConfigError::Empty)));
}

mod registry_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mock_registry(log_dir: std::path::PathBuf) -> ControllerRegistry {
        let mut registry = ControllerRegistry::empty();
        registry.register("MockBes", move |config| {
            let port = booted_port(ADDRESS_LSB);
            let device = BesDevice::open_with(
                config,
                &options(&log_dir),
                connector(vec![port]),
                &mut FakeHardReset::default(),
            )?;
            Ok(Box::new(device) as DeviceBox)
        });
        registry
    }

    #[test]
    fn test_create_get_info_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let registry = mock_registry(dir.path().to_path_buf());

        let mut devices = registry
            .create(&[raw_config("controller_name: MockBes"), raw_config("controller_name: MockBes")])
            .unwrap();

        assert_eq!(devices.len(), 2);
        let info = registry::get_info(&devices);
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].get("controller_name").map(String::as_str), Some("BesDevice"));
        assert_eq!(info[0].get("bluetooth_address").map(String::as_str), Some(ADDRESS));

        registry::destroy(&mut devices);
        registry::destroy(&mut devices);
    }

    #[test]
    fn test_create_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = mock_registry(dir.path().to_path_buf());

        assert!(matches!(registry.create(&[]), Err(RegistryError::EmptyConfig)));
        assert!(matches!(
            registry.create(&[raw_config("")]),
            Err(RegistryError::MissingControllerName)
        ));

        let err = registry
            .create(&[raw_config("controller_name: MockBes"), raw_config("controller_name: Nope")])
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Device class Nope is not supported.");
    }

    #[test]
    fn test_creation_failure_names_the_controller() {
        let dir = tempfile::tempdir().unwrap();
        let registry = mock_registry(dir.path().to_path_buf());

        let err = registry
            .create(&[raw_config("controller_name: MockBes\nshell_mode: 7")])
            .err()
            .unwrap();

        assert!(matches!(err, RegistryError::Creation { ref controller, .. } if controller == "MockBes"));
    }

    #[test]
    fn test_defaults_know_the_bes_controller() {
        let registry = ControllerRegistry::with_defaults(options(std::env::temp_dir().as_path()));

        assert_eq!(registry.supported().collect::<Vec<_>>(), vec!["BesDevice"]);
    }
}
