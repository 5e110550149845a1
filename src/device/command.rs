//! Serial commands understood by the BES firmware.

use std::fmt;

/// Prefix of every harness command on the board's UART.
pub const COMMAND_PREFIX: &str = "mobly_test:";

/// Commands of the board's test shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BesCommand {
    PowerOn,
    PowerOff,
    Reboot,
    FactoryReset,
    GetDeviceInfo,
    GetSerialNumber,
    SetName,
    SetAddress,
    SetFpModelId,
    SetFpPrivateKey,
    SetLinkPoint,

    // TWS
    SetTwsEnable,
    SetComponentNumber,
    GetComponentNumber,
    TwsPairing,
    GetBoxState,
    OpenBox,
    FetchOut,
    WearUp,
    WearDown,
    PutIn,
    CloseBox,

    // Connection
    StartPairingMode,
    StopPairingMode,
    Connect,
    Disconnect,
    ClearPairedDevices,
    GetPairedDevices,

    SetBatteryLevel,
    GetBatteryLevel,

    VolumeUp,
    VolumeDown,
    GetVolume,
    SetVolume,

    MediaPlay,
    MediaPause,
    MediaNext,
    MediaPrev,

    CallAccept,
    CallDecline,
    CallHold,
    CallRedial,

    SetAncMode,
    SetSpatialAudioEnable,
}

impl BesCommand {
    /// Command name without the prefix.
    pub fn name(self) -> &'static str {
        match self {
            Self::PowerOn => "power_on",
            Self::PowerOff => "power_off",
            Self::Reboot => "reboot",
            Self::FactoryReset => "factory_reset",
            Self::GetDeviceInfo => "get_device_info",
            Self::GetSerialNumber => "get_wlt_sn",
            Self::SetName => "set_name",
            Self::SetAddress => "set_address",
            Self::SetFpModelId => "set_model_id",
            Self::SetFpPrivateKey => "set_gfps_private_key",
            Self::SetLinkPoint => "set_link_point",
            Self::SetTwsEnable => "set_link_tws",
            Self::SetComponentNumber => "set_lea_csip",
            Self::GetComponentNumber => "get_lea_csip",
            Self::TwsPairing => "tws_pairing",
            Self::GetBoxState => "get_box_state",
            Self::OpenBox => "open_box",
            Self::FetchOut => "fetch_out",
            Self::WearUp => "wear_up",
            Self::WearDown => "wear_down",
            Self::PutIn => "put_in",
            Self::CloseBox => "close_box",
            Self::StartPairingMode => "enable_pairing",
            Self::StopPairingMode => "disable_pairing",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::ClearPairedDevices => "clear_paired_device",
            Self::GetPairedDevices => "get_paired_device",
            Self::SetBatteryLevel => "set_battery_level",
            Self::GetBatteryLevel => "get_battery_level",
            Self::VolumeUp => "volume_plus",
            Self::VolumeDown => "volume_dec",
            Self::GetVolume => "get_volume",
            Self::SetVolume => "set_volume",
            Self::MediaPlay => "media_play",
            Self::MediaPause => "media_pause",
            Self::MediaNext => "media_next",
            Self::MediaPrev => "media_prev",
            Self::CallAccept => "call_accept",
            Self::CallDecline => "call_decline",
            Self::CallHold => "call_hold",
            Self::CallRedial => "call_redial",
            Self::SetAncMode => "set_anc",
            Self::SetSpatialAudioEnable => "set_spatial_audio",
        }
    }

    /// Full command line with space-separated arguments.
    pub fn with_args(self, args: impl fmt::Display) -> String {
        format!("{self} {args}")
    }
}

impl fmt::Display for BesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_PREFIX}{}", self.name())
    }
}

/// Pairing access mode announced by the board after a reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    InitPairing = 0,
    DisablePairing = 2,
    EnablePairing = 3,
}

/// Active noise cancellation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncMode {
    Off = 0,
    On = 1,
    Transparent = 2,
}

impl std::str::FromStr for AncMode {
    type Err = String;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "transparent" | "transparency" => Ok(Self::Transparent),
            other => Err(format!("Invalid ANC mode: {other}")),
        }
    }
}

/// Position of the TWS earbuds relative to their charging box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxState {
    InBoxClosed,
    InBoxOpen,
    OutBox,
    OutBoxWeared,
}

impl BoxState {
    pub fn is_box_open(self) -> bool {
        matches!(self, Self::InBoxOpen | Self::OutBox | Self::OutBoxWeared)
    }

    pub fn is_in_box(self) -> bool {
        matches!(self, Self::InBoxClosed | Self::InBoxOpen)
    }

    pub fn is_on_head(self) -> bool {
        self == Self::OutBoxWeared
    }
}

impl std::str::FromStr for BoxState {
    type Err = String;

    fn from_str(state: &str) -> Result<Self, Self::Err> {
        match state.trim() {
            "IN_BOX_CLOSED" => Ok(Self::InBoxClosed),
            "IN_BOX_OPEN" => Ok(Self::InBoxOpen),
            "OUT_BOX" => Ok(Self::OutBox),
            "OUT_BOX_WEARED" => Ok(Self::OutBoxWeared),
            other => Err(format!("Unknown box state: {other}")),
        }
    }
}
