//! Interface test code uses to drive a Bluetooth reference device.

use super::error::{DeviceError, DeviceResult};
use crate::address::lsb_addr_to_bd_addr;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity of a reference device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BluetoothInfo {
    /// Classic address, upper-case BD_ADDR.
    pub bluetooth_address: String,
    /// BLE address, upper-case BD_ADDR.
    pub ble_address: String,
    pub bluetooth_name: String,
    pub ble_name: String,
}

impl BluetoothInfo {
    /// Build the info, normalising both addresses to upper-case BD_ADDR.
    ///
    /// Addresses may be given LSB first without separators, as the board
    /// prints them.
    pub fn new(
        bluetooth_address: &str,
        ble_address: &str,
        bluetooth_name: impl Into<String>,
        ble_name: impl Into<String>,
    ) -> DeviceResult<Self> {
        Ok(Self {
            bluetooth_address: lsb_addr_to_bd_addr(bluetooth_address)?.to_uppercase(),
            ble_address: lsb_addr_to_bd_addr(ble_address)?.to_uppercase(),
            bluetooth_name: bluetooth_name.into(),
            ble_name: ble_name.into(),
        })
    }
}

/// A device in the reference device's pairing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairedDevice {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
}

/// Battery levels of a TWS pair, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TwsBatteryLevel {
    pub left: u8,
    pub right: u8,
    /// Only reported by boards that emulate a charging case.
    pub case: Option<u8>,
}

/// Device type reported when a controller does not say otherwise.
pub const DEFAULT_DEVICE_TYPE: &str = "audio device";

/// Common interface of Bluetooth reference device controllers.
///
/// Capabilities that only some boards have (fast pair, SASS, LE audio, TWS,
/// ANC, spatial audio) come with default implementations that report
/// [`DeviceError::NotSupported`] or `false` for the support query.
pub trait BluetoothReferenceDevice {
    /// Short tag identifying the device in logs.
    fn debug_tag(&self) -> String;

    /// Release the device. Safe to call more than once.
    fn destroy(&mut self) -> DeviceResult<()> {
        Ok(())
    }

    /// Free-form information recorded with test results.
    fn get_info(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn reboot(&mut self) -> DeviceResult<()>;

    /// Reset to factory settings. With `wait_for_access` the device must come
    /// back discoverable for pairing.
    fn factory_reset(&mut self, wait_for_access: bool) -> DeviceResult<()>;

    fn power_on(&mut self) -> DeviceResult<()>;
    fn power_off(&mut self) -> DeviceResult<()>;

    fn get_device_info(&mut self) -> DeviceResult<BluetoothInfo>;

    /// Set the classic and BLE address; the device reboots.
    fn set_address(&mut self, address: &str) -> DeviceResult<()>;

    /// Set the classic and BLE name; the device reboots.
    fn set_name(&mut self, bluetooth_name: &str, ble_name: &str) -> DeviceResult<()>;

    // Fast Pair

    fn get_fast_pair_support(&self) -> bool {
        false
    }

    fn enable_fast_pair(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_fast_pair"))
    }

    fn disable_fast_pair(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_fast_pair"))
    }

    /// Model ID and anti-spoofing key currently configured.
    fn get_fp_params(&mut self) -> DeviceResult<(String, String)> {
        Err(DeviceError::NotSupported("get_fp_params"))
    }

    /// Set the Fast Pair model ID (`XXXXXX` or `0xXXXXXX`) and the base64
    /// anti-spoofing private key.
    fn set_fp_params(&mut self, _model_id: &str, _private_key: &str) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_fp_params"))
    }

    fn get_sass_support(&self) -> bool {
        false
    }

    fn enable_sass(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_sass"))
    }

    fn disable_sass(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_sass"))
    }

    fn get_device_type(&self) -> String {
        DEFAULT_DEVICE_TYPE.to_string()
    }

    /// Switch device type. Changing type clears pairings and reboots; setting
    /// the current type does nothing.
    fn set_device_type(&mut self, _device_type: &str) -> DeviceResult<()> {
        Ok(())
    }

    // LE audio

    fn get_lea_support(&self) -> bool {
        false
    }

    fn enable_lea(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_lea"))
    }

    fn disable_lea(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_lea"))
    }

    fn set_single_point(&mut self) -> DeviceResult<()>;
    fn set_multi_point(&mut self) -> DeviceResult<()>;

    /// Make the device discoverable. A running pairing mode is refreshed.
    /// `timeout` ends pairing mode automatically where the device supports it.
    fn start_pairing_mode(&mut self, timeout: Option<Duration>) -> DeviceResult<()>;
    fn stop_pairing_mode(&mut self) -> DeviceResult<()>;

    fn connect(&mut self, address: &str) -> DeviceResult<()>;
    fn disconnect(&mut self, address: &str) -> DeviceResult<()>;
    fn clear_paired_devices(&mut self) -> DeviceResult<()>;
    fn get_paired_devices(&mut self) -> DeviceResult<Vec<PairedDevice>>;

    // TWS

    fn enable_tws(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_tws"))
    }

    fn disable_tws(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_tws"))
    }

    /// Number of components in a coordinated set (1 or 2).
    fn get_component_number(&mut self) -> DeviceResult<u8> {
        Err(DeviceError::NotSupported("get_component_number"))
    }

    fn set_component_number(&mut self, _number: u8) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_component_number"))
    }

    fn pair_tws(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("pair_tws"))
    }

    fn get_in_box_state(&mut self) -> DeviceResult<bool> {
        Err(DeviceError::NotSupported("get_in_box_state"))
    }

    fn set_in_box_state(&mut self, _in_box: bool) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_in_box_state"))
    }

    fn get_on_head_state(&mut self) -> DeviceResult<bool> {
        Err(DeviceError::NotSupported("get_on_head_state"))
    }

    fn set_on_head_state(&mut self, _on_head: bool) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_on_head_state"))
    }

    fn open_box(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("open_box"))
    }

    fn fetch_out(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("fetch_out"))
    }

    fn wear_up(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("wear_up"))
    }

    fn wear_down(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("wear_down"))
    }

    fn put_in(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("put_in"))
    }

    fn close_box(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("close_box"))
    }

    // Battery

    /// Set the fake battery level, 0-100.
    fn set_battery_level(&mut self, level: u8) -> DeviceResult<()>;
    fn get_battery_level(&mut self) -> DeviceResult<u8>;

    fn set_battery_level_tws(&mut self, _level: TwsBatteryLevel) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_battery_level_tws"))
    }

    fn get_battery_level_tws(&mut self) -> DeviceResult<TwsBatteryLevel> {
        Err(DeviceError::NotSupported("get_battery_level_tws"))
    }

    // Media and volume

    fn media_play(&mut self) -> DeviceResult<()>;
    fn media_pause(&mut self) -> DeviceResult<()>;
    fn media_next(&mut self) -> DeviceResult<()>;
    fn media_prev(&mut self) -> DeviceResult<()>;

    /// Raise the volume by `steps` increments.
    fn volume_up(&mut self, steps: u32) -> DeviceResult<()>;
    fn volume_down(&mut self, steps: u32) -> DeviceResult<()>;
    fn set_volume(&mut self, level: u8) -> DeviceResult<()>;
    fn get_volume(&mut self) -> DeviceResult<u8>;

    // Calls

    fn call_accept(&mut self) -> DeviceResult<()>;
    fn call_decline(&mut self) -> DeviceResult<()>;
    fn call_hold(&mut self) -> DeviceResult<()>;
    fn call_redial(&mut self) -> DeviceResult<()>;

    // ANC and spatial audio

    fn get_anc_support(&self) -> bool {
        false
    }

    fn enable_anc(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_anc"))
    }

    fn disable_anc(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_anc"))
    }

    fn get_anc_mode(&mut self) -> DeviceResult<String> {
        Err(DeviceError::NotSupported("get_anc_mode"))
    }

    fn set_anc_mode(&mut self, _mode: &str) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("set_anc_mode"))
    }

    fn get_spatial_audio_support(&self) -> bool {
        false
    }

    fn enable_spatial_audio(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("enable_spatial_audio"))
    }

    fn disable_spatial_audio(&mut self) -> DeviceResult<()> {
        Err(DeviceError::NotSupported("disable_spatial_audio"))
    }

    /// Write log excerpts for the test that just ran into `output_dir`.
    fn create_output_excerpts(&mut self, _output_dir: &Path) -> DeviceResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_normalises_addresses() {
        let info = BluetoothInfo::new("665544332211", "aa:bb:cc:dd:ee:ff", "bt", "ble").unwrap();
        assert_eq!(info.bluetooth_address, "11:22:33:44:55:66");
        assert_eq!(info.ble_address, "AA:BB:CC:DD:EE:FF");
        assert!(BluetoothInfo::new("nope", "665544332211", "bt", "ble").is_err());
    }

    #[test]
    fn test_paired_device_json_keys() {
        let device = PairedDevice {
            name: "Phone A".into(),
            address: "00:11:22:33:44:55".into(),
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["Name"], "Phone A");
        assert_eq!(json["Address"], "00:11:22:33:44:55");
    }
}
