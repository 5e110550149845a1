//! Controller for the BES Bluetooth dev board.
//!
//! The board is attached to the host over a UART. Commands are written as
//! `mobly_test:<name> [args]` lines; the board answers in its log stream
//! (see [`super::response`]). Everything the board prints is also copied
//! to a host log file so tests can attach excerpts to their results.

use super::base::{BluetoothInfo, BluetoothReferenceDevice, PairedDevice, TwsBatteryLevel};
use super::command::{AccessMode, AncMode, BesCommand, BoxState};
use super::error::{DeviceError, DeviceResult};
use super::log_recorder::{file_timestamp, LogRecorder};
use super::session::{BoardSession, CommandTimings};
use crate::address::{
    compact_address, decode_fp_private_key, ensure_valid_address, lsb_addr_to_bd_addr,
    reverse_fp_model_id,
};
use crate::config::{DeviceConfig, HarnessConfig, RawDeviceConfig, SerialConfig};
use crate::hid::{HardReset, LocalHardReset};
use crate::port::{PortAdapter, PortConfiguration, PortError, SyncSerialPort};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of this controller in test-bed configs.
pub const CONTROLLER_NAME: &str = "BesDevice";

const MAX_BATTERY_LEVEL: u8 = 100;
const MAX_VOLUME: u8 = 127;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).expect("static regex"));
    };
}

pattern!(REBOOT_DONE, r"^.*bt_stack_init_done");
pattern!(FIRMWARE_BUILD_DATE, r"^.*BUILD_DATE=(?P<build_date>.*)");
pattern!(FIRMWARE_VERSION, r"^.*REV_INFO=(?P<version>.*)");
pattern!(DEVICE_INFO, r"(?P<key>.*): (?P<value>.*)");
pattern!(VOLUME, r".*volume=(?P<level>\d+)");
pattern!(BLE_VOLUME, r".*BLE volume=(?P<level>\d+)");
pattern!(BATTERY_LEVEL, r"^.*battery_level: (?P<level>\d+)");
pattern!(
    TWS_BATTERY_LEVEL,
    r"^Main ear battery_level: (?P<left>\d+)\nRemote ear battery_level: (?P<right>\d+)(?:\nCase battery_level: (?P<case>\d+))?"
);
pattern!(PAIRED_DEVICE, r"addr: (?P<addr>.*)\r?\n.*name: (?P<name>.*)");
pattern!(LE_PAIRED_DEVICE, r"BLE addr: (?P<addr>.*)");
pattern!(BOX_STATE, r"^box_state=(?P<state>.*)");
pattern!(NUMBER, r"\d+");

/// Host-side settings shared by every BES controller of a run.
#[derive(Debug, Clone)]
pub struct BesOptions {
    /// Root directory of the per-device log directories.
    pub log_dir: PathBuf,
    pub timings: CommandTimings,
    /// UART settings and port aliases.
    pub serial: SerialConfig,
    pub hard_reset: LocalHardReset,
}

impl Default for BesOptions {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl BesOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            log_dir: config.resolved_log_dir(),
            timings: config.board.timings(),
            serial: config.serial.clone(),
            hard_reset: config.hid.local_hard_reset(),
        }
    }
}

/// Build one controller per `BesDevice` test-bed entry.
pub fn create(configs: &[RawDeviceConfig], options: &BesOptions) -> DeviceResult<Vec<BesDevice>> {
    DeviceConfig::from_raw_list(configs)?
        .into_iter()
        .map(|config| BesDevice::open(config, options.clone()))
        .collect()
}

/// One BES dev board.
pub struct BesDevice {
    config: DeviceConfig,
    timings: CommandTimings,
    log_path: PathBuf,
    session: Option<BoardSession>,
    output_filename: Option<String>,
    firmware_version: Option<String>,
    debug_tag: String,
}

impl BesDevice {
    /// Connect to the board on its configured serial port.
    pub fn open(config: DeviceConfig, options: BesOptions) -> DeviceResult<Self> {
        let serial = options.serial.clone();
        let port_config = PortConfiguration::for_board(serial.baud_rate, serial.read_timeout());
        let mut hard_reset = options.hard_reset.clone();
        Self::open_with(
            config,
            &options,
            move |name| {
                let port = SyncSerialPort::open(&serial.resolve_port(name), port_config.clone())?;
                Ok(Box::new(port) as PortAdapter)
            },
            &mut hard_reset,
        )
    }

    /// Connect through `connect`, falling back to `hard_reset` once when the
    /// board cannot be initialised and the config allows it.
    pub fn open_with<C>(
        config: DeviceConfig,
        options: &BesOptions,
        mut connect: C,
        hard_reset: &mut dyn HardReset,
    ) -> DeviceResult<Self>
    where
        C: FnMut(&str) -> Result<PortAdapter, PortError>,
    {
        debug!(
            address = %config.bluetooth_address,
            serial_port = %config.serial_port,
            "creating BES device"
        );
        let mut device = Self::unconnected(config, options);

        match device.init_connection(&mut connect) {
            Ok(()) => return Ok(device),
            Err(e) => {
                device.close_session();
                if !device.config.enable_hard_reset {
                    return Err(e);
                }
                warn!(
                    device = %device.debug_tag,
                    error = %e,
                    "Failed to initialize BES device, trying a hard power on. If the board still \
                     fails to initialize, the board needs manual recovery."
                );
            }
        }

        hard_reset.hard_reset()?;
        if let Err(e) = device.init_connection(&mut connect) {
            device.close_session();
            return Err(e);
        }
        Ok(device)
    }

    fn unconnected(config: DeviceConfig, options: &BesOptions) -> Self {
        let directory = format!("BesDevice_{}", config.bluetooth_address).replace(':', "-");
        Self {
            debug_tag: config.bluetooth_address.clone(),
            log_path: options.log_dir.join(directory),
            timings: options.timings,
            session: None,
            output_filename: None,
            firmware_version: None,
            config,
        }
    }

    fn init_connection<C>(&mut self, connect: &mut C) -> DeviceResult<()>
    where
        C: FnMut(&str) -> Result<PortAdapter, PortError>,
    {
        if self.config.shell_mode {
            warn!(device = %self.debug_tag, "shell mode requested; using the serial driver");
        }
        let port = connect(&self.config.serial_port)?;
        let log_file = self.log_path.join(format!("bes_log_{}.txt", file_timestamp()));
        let recorder = LogRecorder::create(log_file)?;
        self.session = Some(BoardSession::new(port, Some(recorder), self.timings));

        self.generate_output_filename()?;

        if let Err(e) = self.sync_address() {
            if !e.is_command_error() {
                return Err(e);
            }
            // Junk in the board's UART input buffer can make it miss a command.
            warn!(device = %self.debug_tag, error = %e, "Failed to set Bluetooth address to configured address. Retrying.");
            std::thread::sleep(self.timings.execution_timeout);
            self.sync_address()?;
        }
        Ok(())
    }

    fn generate_output_filename(&mut self) -> DeviceResult<()> {
        let filename = format!(
            "bes_log,{},{}.txt",
            self.config.bluetooth_address.replace(':', "-"),
            file_timestamp()
        );
        self.log_board_time(&filename)?;
        self.output_filename = Some(filename);
        Ok(())
    }

    /// Wait for any board output and log its clock for log alignment.
    fn log_board_time(&mut self, filename: &str) -> DeviceResult<()> {
        let timeout = self.timings.reboot_timeout;
        let line = self
            .session()?
            .wait_for(timeout, |_| true)?
            .ok_or(DeviceError::NoLogOutput)?;
        info!(
            device = %self.debug_tag,
            device_time = %line.time,
            output = filename,
            "Log alignment: current BES device time"
        );
        Ok(())
    }

    fn sync_address(&mut self) -> DeviceResult<()> {
        let info = self.get_device_info()?;
        let wanted = self.config.bluetooth_address.to_uppercase();
        if info.bluetooth_address != wanted || info.ble_address != wanted {
            let address = self.config.bluetooth_address.clone();
            self.set_address(&address)?;
        }
        Ok(())
    }

    fn close_session(&mut self) {
        if self.session.take().is_some() {
            debug!(device = %self.debug_tag, "serial session closed");
        }
    }

    fn session(&mut self) -> DeviceResult<&mut BoardSession> {
        self.session
            .as_mut()
            .ok_or_else(|| DeviceError::runtime("BES serial session not started."))
    }

    fn send(&mut self, command: BesCommand) -> DeviceResult<String> {
        self.session()?.send_command(&command.to_string(), true)
    }

    fn send_with(&mut self, command: BesCommand, args: impl std::fmt::Display) -> DeviceResult<String> {
        self.session()?.send_command(&command.with_args(args), true)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn set_debug_tag(&mut self, tag: impl Into<String>) {
        self.debug_tag = tag.into();
        debug!(device = %self.debug_tag, "debug tag set");
    }

    /// Directory holding this device's host logs.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// `<version>:<build date>` as printed during the last reboot.
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn get_serial_number(&mut self) -> DeviceResult<String> {
        self.send(BesCommand::GetSerialNumber)
    }

    fn reboot_and_wait(
        &mut self,
        command: BesCommand,
        fail_message: &str,
        access_mode: AccessMode,
    ) -> DeviceResult<()> {
        let timings = self.timings;
        let access_marker = format!("Access mode changed to {}", access_mode as u8);
        let session = self.session()?;
        session.send_command(&command.to_string(), false)?;

        let mut version = None;
        let mut build_date = None;
        let mut reboot_done = false;
        let mut access_seen = false;
        let mut deadline = Instant::now() + timings.reboot_timeout;

        while !(reboot_done && access_seen) {
            let Some(line) = session.next_line(deadline)? else {
                break;
            };
            if version.is_none() {
                version = FIRMWARE_VERSION
                    .captures(&line.message)
                    .map(|c| c["version"].trim().to_string());
            }
            if build_date.is_none() {
                build_date = FIRMWARE_BUILD_DATE
                    .captures(&line.message)
                    .map(|c| c["build_date"].split_whitespace().collect::<Vec<_>>().join("_"));
            }
            if !reboot_done && REBOOT_DONE.is_match(&line.message) {
                reboot_done = true;
                deadline = Instant::now() + timings.reboot_timeout;
            }
            if line.message.contains(&access_marker) {
                access_seen = true;
            }
        }

        let parts: Vec<String> = version.into_iter().chain(build_date).collect();
        if !parts.is_empty() {
            let firmware = parts.join(":");
            info!(device = %self.debug_tag, firmware = %firmware, "BES firmware version");
            self.firmware_version = Some(firmware);
        }

        if !reboot_done {
            return Err(DeviceError::runtime(fail_message));
        }
        if !access_seen {
            return Err(DeviceError::runtime(format!(
                "Failed to wait for access mode {} after reboot.",
                access_mode as u8
            )));
        }

        std::thread::sleep(timings.reboot_settle);
        Ok(())
    }

    /// Set names and Fast Pair parameters with a single reboot.
    pub fn set_name_and_fp_params(
        &mut self,
        bluetooth_name: &str,
        ble_name: &str,
        model_id: &str,
        private_key: &str,
    ) -> DeviceResult<()> {
        self.send_with(BesCommand::SetName, format!("\"{bluetooth_name}\" \"{ble_name}\""))?;
        std::thread::sleep(self.timings.command_interval);
        self.set_fp_params(model_id, private_key)
    }

    fn box_state(&mut self) -> DeviceResult<BoxState> {
        let result = self.send(BesCommand::GetBoxState)?;
        BOX_STATE
            .captures(&result)
            .and_then(|c| c["state"].parse().ok())
            .ok_or_else(|| DeviceError::runtime(format!("Failed to get box state from command result: {result}")))
    }

    pub fn get_box_open_state(&mut self) -> DeviceResult<bool> {
        Ok(self.box_state()?.is_box_open())
    }

    /// BLE volume level, reported next to the classic one.
    pub fn get_ble_volume(&mut self) -> DeviceResult<u8> {
        let result = self.send(BesCommand::GetVolume)?;
        parse_level(&BLE_VOLUME, &result)
            .ok_or_else(|| DeviceError::runtime(format!("Failed to get BLE volume level from command result: {result}")))
    }
}

fn parse_level(pattern: &Regex, text: &str) -> Option<u8> {
    pattern.captures(text).and_then(|c| c["level"].parse().ok())
}

fn ensure_battery_level(level: u8) -> DeviceResult<()> {
    if level > MAX_BATTERY_LEVEL {
        return Err(DeviceError::invalid_argument(format!(
            "Invalid battery level {level}, should be in the range of 0-100."
        )));
    }
    Ok(())
}

/// Parse the `key: value` lines of a `get_device_info` response.
fn parse_device_info(message: &str) -> DeviceResult<BluetoothInfo> {
    let fields: HashMap<&str, &str> = DEVICE_INFO
        .captures_iter(message)
        .filter_map(|c| Some((c.name("key")?.as_str(), c.name("value")?.as_str())))
        .collect();
    let field = |key: &str| {
        fields
            .get(key)
            .map(|v| v.trim())
            .ok_or_else(|| DeviceError::runtime(format!("Failed to parse device info: {message}")))
    };
    BluetoothInfo::new(field("bt_addr")?, field("ble_addr")?, field("bt_name")?, field("ble_name")?)
}

fn parse_paired_devices(message: &str) -> DeviceResult<Vec<PairedDevice>> {
    let classic = PAIRED_DEVICE.captures_iter(message).map(|c| -> DeviceResult<PairedDevice> {
        Ok(PairedDevice {
            name: c["name"].trim().to_string(),
            address: lsb_addr_to_bd_addr(c["addr"].trim())?,
        })
    });
    let le = LE_PAIRED_DEVICE.captures_iter(message).map(|c| -> DeviceResult<PairedDevice> {
        Ok(PairedDevice {
            name: String::new(),
            address: lsb_addr_to_bd_addr(c["addr"].trim())?,
        })
    });
    classic.chain(le).collect()
}

fn parse_tws_battery(message: &str) -> DeviceResult<TwsBatteryLevel> {
    let invalid = || DeviceError::runtime(format!("Failed to get valid battery level from command result: {message}"));
    let caps = TWS_BATTERY_LEVEL.captures(message).ok_or_else(|| {
        DeviceError::runtime(format!("Failed to get battery level of TWS earbuds from command result: {message}"))
    })?;

    let level = |name: &str| -> DeviceResult<Option<u8>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse::<u8>().map(Some).map_err(|_| invalid()),
            None => Ok(None),
        }
    };
    let left = level("left")?.ok_or_else(invalid)?;
    let right = level("right")?.ok_or_else(invalid)?;
    if left > MAX_BATTERY_LEVEL || right > MAX_BATTERY_LEVEL {
        return Err(invalid());
    }
    Ok(TwsBatteryLevel {
        left,
        right,
        case: level("case")?,
    })
}

impl BluetoothReferenceDevice for BesDevice {
    fn debug_tag(&self) -> String {
        self.debug_tag.clone()
    }

    fn destroy(&mut self) -> DeviceResult<()> {
        self.close_session();
        Ok(())
    }

    fn get_info(&self) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        info.insert("controller_name".to_string(), CONTROLLER_NAME.to_string());
        info.insert("bluetooth_address".to_string(), self.config.bluetooth_address.clone());
        info.insert("serial_port".to_string(), self.config.serial_port.clone());
        if let Some(version) = &self.firmware_version {
            info.insert("firmware_version".to_string(), version.clone());
        }
        info
    }

    fn reboot(&mut self) -> DeviceResult<()> {
        self.reboot_and_wait(
            BesCommand::Reboot,
            "Failed to wait for device reboot.",
            AccessMode::InitPairing,
        )
    }

    fn factory_reset(&mut self, wait_for_access: bool) -> DeviceResult<()> {
        let access_mode = if wait_for_access {
            AccessMode::EnablePairing
        } else {
            AccessMode::InitPairing
        };
        self.reboot_and_wait(
            BesCommand::FactoryReset,
            "Failed to wait for device factory reset.",
            access_mode,
        )
    }

    fn power_on(&mut self) -> DeviceResult<()> {
        self.open_box()
    }

    fn power_off(&mut self) -> DeviceResult<()> {
        self.close_box()
    }

    fn get_device_info(&mut self) -> DeviceResult<BluetoothInfo> {
        let message = self.send(BesCommand::GetDeviceInfo)?;
        parse_device_info(&message)
    }

    fn set_address(&mut self, address: &str) -> DeviceResult<()> {
        ensure_valid_address(address)?;
        let command = BesCommand::SetAddress.with_args(address);
        self.session()?.send_command(&command, false)?;
        std::thread::sleep(self.timings.reboot_settle);
        self.reboot()
    }

    fn set_name(&mut self, bluetooth_name: &str, ble_name: &str) -> DeviceResult<()> {
        self.send_with(BesCommand::SetName, format!("\"{bluetooth_name}\" \"{ble_name}\""))?;
        self.reboot()
    }

    fn get_fast_pair_support(&self) -> bool {
        true
    }

    fn set_fp_params(&mut self, model_id: &str, private_key: &str) -> DeviceResult<()> {
        let reversed_model_id = reverse_fp_model_id(model_id)?;
        let decoded_private_key = decode_fp_private_key(private_key)?;

        self.send_with(BesCommand::SetFpModelId, reversed_model_id)?;
        std::thread::sleep(self.timings.command_interval);
        self.send_with(BesCommand::SetFpPrivateKey, decoded_private_key)?;
        self.reboot()
    }

    fn get_sass_support(&self) -> bool {
        true
    }

    fn get_lea_support(&self) -> bool {
        true
    }

    fn set_single_point(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetLinkPoint, 1).map(drop)
    }

    fn set_multi_point(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetLinkPoint, 2).map(drop)
    }

    fn start_pairing_mode(&mut self, timeout: Option<Duration>) -> DeviceResult<()> {
        if let Some(timeout) = timeout {
            debug!(?timeout, "pairing mode timeout is not supported by the firmware, ignoring");
        }
        self.send(BesCommand::StartPairingMode).map(drop)
    }

    fn stop_pairing_mode(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::StopPairingMode).map(drop)
    }

    fn connect(&mut self, address: &str) -> DeviceResult<()> {
        ensure_valid_address(address)?;
        self.send_with(BesCommand::Connect, compact_address(address)).map(drop)
    }

    fn disconnect(&mut self, address: &str) -> DeviceResult<()> {
        ensure_valid_address(address)?;
        self.send_with(BesCommand::Disconnect, compact_address(address)).map(drop)
    }

    fn clear_paired_devices(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::ClearPairedDevices).map(drop)
    }

    fn get_paired_devices(&mut self) -> DeviceResult<Vec<PairedDevice>> {
        let message = self.send(BesCommand::GetPairedDevices)?;
        parse_paired_devices(&message)
    }

    fn enable_tws(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetTwsEnable, 1).map(drop)
    }

    fn disable_tws(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetTwsEnable, 0).map(drop)
    }

    fn get_component_number(&mut self) -> DeviceResult<u8> {
        let result = self.send(BesCommand::GetComponentNumber)?;
        NUMBER
            .find(&result)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| DeviceError::runtime(format!("Failed to get component number from command result: {result}")))
    }

    fn set_component_number(&mut self, number: u8) -> DeviceResult<()> {
        if !matches!(number, 1 | 2) {
            return Err(DeviceError::invalid_argument(format!("Invalid component number {number}")));
        }
        self.send_with(BesCommand::SetComponentNumber, number).map(drop)
    }

    fn pair_tws(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::TwsPairing).map(drop)
    }

    fn get_in_box_state(&mut self) -> DeviceResult<bool> {
        Ok(self.box_state()?.is_in_box())
    }

    fn set_in_box_state(&mut self, in_box: bool) -> DeviceResult<()> {
        let current = self.box_state()?;
        if current.is_in_box() == in_box {
            return Ok(());
        }
        if current.is_in_box() {
            if !current.is_box_open() {
                self.send(BesCommand::OpenBox)?;
            }
            self.send(BesCommand::FetchOut)?;
        } else {
            if current.is_on_head() {
                self.send(BesCommand::WearDown)?;
            }
            self.send(BesCommand::PutIn)?;
        }
        Ok(())
    }

    fn get_on_head_state(&mut self) -> DeviceResult<bool> {
        Ok(self.box_state()?.is_on_head())
    }

    fn set_on_head_state(&mut self, on_head: bool) -> DeviceResult<()> {
        let current = self.box_state()?;
        if current.is_on_head() == on_head {
            return Ok(());
        }
        if current.is_on_head() {
            return self.wear_down();
        }
        if !current.is_box_open() {
            self.send(BesCommand::OpenBox)?;
        }
        if current.is_in_box() {
            self.send(BesCommand::FetchOut)?;
        }
        self.send(BesCommand::WearUp).map(drop)
    }

    fn open_box(&mut self) -> DeviceResult<()> {
        if self.get_box_open_state()? {
            return Err(DeviceError::runtime("The box is already open, cannot re-open."));
        }
        self.send(BesCommand::OpenBox).map(drop)
    }

    fn fetch_out(&mut self) -> DeviceResult<()> {
        if !self.get_in_box_state()? {
            return Err(DeviceError::runtime("The BES device is not in box, cannot fetch out."));
        }
        self.send(BesCommand::FetchOut).map(drop)
    }

    fn wear_up(&mut self) -> DeviceResult<()> {
        let current = self.box_state()?;
        if current.is_on_head() {
            return Err(DeviceError::runtime("The BES device is already on head, cannot wear up."));
        }
        if current.is_in_box() {
            return Err(DeviceError::runtime("The BES device is in box, cannot wear up."));
        }
        self.send(BesCommand::WearUp).map(drop)
    }

    fn wear_down(&mut self) -> DeviceResult<()> {
        if !self.get_on_head_state()? {
            return Err(DeviceError::runtime("The BES device is not on head, cannot wear down."));
        }
        self.send(BesCommand::WearDown).map(drop)
    }

    fn put_in(&mut self) -> DeviceResult<()> {
        let current = self.box_state()?;
        if current.is_in_box() {
            return Err(DeviceError::runtime("The BES device is already in box, cannot put in."));
        }
        if current.is_on_head() {
            return Err(DeviceError::runtime("The BES device is on head, cannot put in."));
        }
        self.send(BesCommand::PutIn).map(drop)
    }

    fn close_box(&mut self) -> DeviceResult<()> {
        if !self.get_box_open_state()? {
            return Err(DeviceError::runtime("The box is already closed, cannot re-close."));
        }
        self.send(BesCommand::CloseBox).map(drop)
    }

    fn set_battery_level(&mut self, level: u8) -> DeviceResult<()> {
        ensure_battery_level(level)?;
        self.send_with(BesCommand::SetBatteryLevel, format!("{level} {level}")).map(drop)
    }

    fn get_battery_level(&mut self) -> DeviceResult<u8> {
        let result = self.send(BesCommand::GetBatteryLevel)?;
        parse_level(&BATTERY_LEVEL, &result)
            .ok_or_else(|| DeviceError::runtime(format!("Failed to get battery level from command result: {result}")))
    }

    fn set_battery_level_tws(&mut self, level: TwsBatteryLevel) -> DeviceResult<()> {
        ensure_battery_level(level.left)?;
        ensure_battery_level(level.right)?;
        let args = match level.case {
            Some(case) => {
                ensure_battery_level(case)?;
                format!("{} {} {case}", level.left, level.right)
            }
            None => format!("{} {}", level.left, level.right),
        };
        self.send_with(BesCommand::SetBatteryLevel, args).map(drop)
    }

    fn get_battery_level_tws(&mut self) -> DeviceResult<TwsBatteryLevel> {
        let result = self.send(BesCommand::GetBatteryLevel)?;
        parse_tws_battery(&result)
    }

    fn media_play(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::MediaPlay).map(drop)
    }

    fn media_pause(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::MediaPause).map(drop)
    }

    fn media_next(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::MediaNext).map(drop)
    }

    fn media_prev(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::MediaPrev).map(drop)
    }

    fn volume_up(&mut self, steps: u32) -> DeviceResult<()> {
        for _ in 0..steps {
            self.send(BesCommand::VolumeUp)?;
        }
        Ok(())
    }

    fn volume_down(&mut self, steps: u32) -> DeviceResult<()> {
        for _ in 0..steps {
            self.send(BesCommand::VolumeDown)?;
        }
        Ok(())
    }

    fn set_volume(&mut self, level: u8) -> DeviceResult<()> {
        if level > MAX_VOLUME {
            return Err(DeviceError::invalid_argument(format!(
                "Invalid volume level {level}, should be in the range of [0, 127]."
            )));
        }
        self.send_with(BesCommand::SetVolume, level).map(drop)
    }

    fn get_volume(&mut self) -> DeviceResult<u8> {
        let result = self.send(BesCommand::GetVolume)?;
        parse_level(&VOLUME, &result)
            .ok_or_else(|| DeviceError::runtime(format!("Failed to get volume level from command result: {result}")))
    }

    fn call_accept(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::CallAccept).map(drop)
    }

    fn call_decline(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::CallDecline).map(drop)
    }

    fn call_hold(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::CallHold).map(drop)
    }

    fn call_redial(&mut self) -> DeviceResult<()> {
        self.send(BesCommand::CallRedial).map(drop)
    }

    fn get_anc_support(&self) -> bool {
        true
    }

    // ANC is always available on the board; there is nothing to switch on.
    fn enable_anc(&mut self) -> DeviceResult<()> {
        Ok(())
    }

    fn set_anc_mode(&mut self, mode: &str) -> DeviceResult<()> {
        let mode: AncMode = mode.parse().map_err(DeviceError::InvalidArgument)?;
        self.send_with(BesCommand::SetAncMode, mode as u8).map(drop)
    }

    fn get_spatial_audio_support(&self) -> bool {
        true
    }

    fn enable_spatial_audio(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetSpatialAudioEnable, 1).map(drop)
    }

    fn disable_spatial_audio(&mut self) -> DeviceResult<()> {
        self.send_with(BesCommand::SetSpatialAudioEnable, 0).map(drop)
    }

    fn create_output_excerpts(&mut self, output_dir: &Path) -> DeviceResult<Vec<PathBuf>> {
        let filename = self
            .output_filename
            .clone()
            .ok_or_else(|| DeviceError::runtime("No output filename. Connect to the board first."))?;
        let recorder = self
            .session
            .as_mut()
            .and_then(|s| s.recorder_mut())
            .ok_or_else(|| DeviceError::runtime("BES log recorder not started."))?;

        let excerpt = output_dir.join(filename);
        debug!(path = %excerpt.display(), "creating output excerpt");
        recorder.clip_new_content(&excerpt)?;
        Ok(vec![excerpt])
    }
}

impl std::fmt::Debug for BesDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<BesDevice|{}>", self.debug_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_device_info() {
        let info = parse_device_info(
            "bt_addr: 665544332211\nble_addr: 665544332211\nbt_name: Board L\nble_name: Board LE",
        )
        .unwrap();

        assert_eq!(info.bluetooth_address, "11:22:33:44:55:66");
        assert_eq!(info.ble_address, "11:22:33:44:55:66");
        assert_eq!(info.bluetooth_name, "Board L");
        assert_eq!(info.ble_name, "Board LE");
    }

    #[test]
    fn test_parse_device_info_missing_field() {
        let err = parse_device_info("bt_addr: 665544332211").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse device info"));
    }

    #[test]
    fn test_parse_paired_devices() {
        let devices = parse_paired_devices(
            "addr: 554433221100\nname: Phone A\naddr: BBAA99887766\nname: Phone B\nBLE addr: 0A0B0C0D0E0F",
        )
        .unwrap();

        assert_eq!(
            devices,
            vec![
                PairedDevice { name: "Phone A".into(), address: "00:11:22:33:44:55".into() },
                PairedDevice { name: "Phone B".into(), address: "66:77:88:99:AA:BB".into() },
                PairedDevice { name: String::new(), address: "0F:0E:0D:0C:0B:0A".into() },
            ]
        );
        assert!(parse_paired_devices("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tws_battery() {
        let levels = parse_tws_battery("Main ear battery_level: 80\nRemote ear battery_level: 70\nCase battery_level: 60")
            .unwrap();
        assert_eq!(levels, TwsBatteryLevel { left: 80, right: 70, case: Some(60) });

        let levels = parse_tws_battery("Main ear battery_level: 10\nRemote ear battery_level: 20").unwrap();
        assert_eq!(levels.case, None);

        assert!(parse_tws_battery("Main ear battery_level: 180\nRemote ear battery_level: 20").is_err());
        assert!(parse_tws_battery("battery_level: 20").is_err());
    }

    #[test]
    fn test_volume_patterns() {
        assert_eq!(parse_level(&VOLUME, "A2DP volume=12, BLE volume=7"), Some(7));
        assert_eq!(parse_level(&VOLUME, "volume=12\nBLE volume=7"), Some(12));
        assert_eq!(parse_level(&BLE_VOLUME, "volume=12\nBLE volume=7"), Some(7));
        assert_eq!(parse_level(&BATTERY_LEVEL, "mute"), None);
    }
}
