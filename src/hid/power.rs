//! Hard reset of the board through its HID control port.
//!
//! Used when the serial link cannot be brought up: the MCU firmware is
//! checked first (only the stable build handles the power commands
//! reliably), then the board is powered on and rebooted.

use super::error::HidError;
use super::sender::HidCommandSender;
use super::tool::ToolOptions;
use super::traits::HidBackend;
use crate::device::command::BesCommand;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::info;

/// Query answered by the MCU with its firmware version.
pub const MCU_VERSION_QUERY: &str = "WLTVER?";

/// MCU firmware known to handle power commands.
pub const STABLE_MCU_VERSION: &str = "V1.0.3";

static MCU_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"V\d\.\d\.\d").expect("static regex"));

/// Something that can power-cycle the reference board out of band.
pub trait HardReset {
    fn hard_reset(&mut self) -> Result<(), HidError>;
}

/// Waits between the steps of the power sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerCycleTimings {
    pub after_version_check: Duration,
    pub after_power_on: Duration,
    pub after_reboot: Duration,
}

impl Default for PowerCycleTimings {
    fn default() -> Self {
        Self {
            after_version_check: Duration::from_secs(10),
            after_power_on: Duration::from_secs(30),
            after_reboot: Duration::from_secs(30),
        }
    }
}

impl PowerCycleTimings {
    /// No waiting at all, for mocks.
    pub fn immediate() -> Self {
        Self {
            after_version_check: Duration::ZERO,
            after_power_on: Duration::ZERO,
            after_reboot: Duration::ZERO,
        }
    }
}

/// [`HardReset`] over the HID command sender.
pub struct HidPowerCycler<B> {
    sender: HidCommandSender<B>,
    timings: PowerCycleTimings,
    stable_version: String,
}

impl<B: HidBackend> HidPowerCycler<B> {
    pub fn new(sender: HidCommandSender<B>, timings: PowerCycleTimings) -> Self {
        Self {
            sender,
            timings,
            stable_version: STABLE_MCU_VERSION.to_string(),
        }
    }

    /// Accept a different MCU build as stable.
    pub fn with_stable_version(mut self, version: impl Into<String>) -> Self {
        self.stable_version = version.into();
        self
    }

    pub fn sender(&self) -> &HidCommandSender<B> {
        &self.sender
    }

    /// Fail if any device reports an MCU version other than the stable one.
    pub fn check_mcu_version(&mut self) -> Result<(), HidError> {
        let report = self.sender.send(MCU_VERSION_QUERY)?;
        for response in report.responses() {
            for found in MCU_VERSION.find_iter(response) {
                if found.as_str() != self.stable_version {
                    return Err(HidError::UnstableMcuVersion {
                        found: found.as_str().to_string(),
                        expected: self.stable_version.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn send_all(&mut self, command: &str) -> Result<(), HidError> {
        let report = self.sender.send(command)?;
        if report.is_success() {
            Ok(())
        } else {
            Err(HidError::ScanFailed {
                command: command.to_string(),
                failed: report.failed_count(),
            })
        }
    }
}

impl<B: HidBackend> HardReset for HidPowerCycler<B> {
    fn hard_reset(&mut self) -> Result<(), HidError> {
        info!("hard resetting reference boards over HID");
        self.check_mcu_version()?;
        std::thread::sleep(self.timings.after_version_check);

        self.send_all(&BesCommand::PowerOn.to_string())?;
        std::thread::sleep(self.timings.after_power_on);

        self.send_all(&BesCommand::Reboot.to_string())?;
        std::thread::sleep(self.timings.after_reboot);
        info!("hard reset sequence finished");
        Ok(())
    }
}

/// Hard reset of the boards attached to this host, opening the HID library
/// only when a reset is actually needed.
#[derive(Debug, Clone)]
pub struct LocalHardReset {
    pub options: ToolOptions,
    pub timings: PowerCycleTimings,
    pub stable_version: String,
}

impl Default for LocalHardReset {
    fn default() -> Self {
        Self {
            options: ToolOptions::default(),
            timings: PowerCycleTimings::default(),
            stable_version: STABLE_MCU_VERSION.to_string(),
        }
    }
}

impl HardReset for LocalHardReset {
    #[cfg(feature = "hidraw")]
    fn hard_reset(&mut self) -> Result<(), HidError> {
        let sender = HidCommandSender::new(super::HidApiBackend::new()?)
            .with_ids(self.options.vendor_id, self.options.product_id)
            .with_read_timeout(self.options.read_timeout);
        HidPowerCycler::new(sender, self.timings)
            .with_stable_version(self.stable_version.clone())
            .hard_reset()
    }

    #[cfg(not(feature = "hidraw"))]
    fn hard_reset(&mut self) -> Result<(), HidError> {
        Err(HidError::Init(
            "built without the `hidraw` feature, hard reset is unavailable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::mock::{MockDevice, MockHidBackend};

    fn cycler(devices: Vec<MockDevice>) -> HidPowerCycler<MockHidBackend> {
        HidPowerCycler::new(
            HidCommandSender::new(MockHidBackend::new(devices)),
            PowerCycleTimings::immediate(),
        )
    }

    #[test]
    fn test_sequence_on_stable_mcu() {
        let mut cycler = cycler(vec![MockDevice::responding("/dev/hidraw0", "MCU V1.0.3")]);
        cycler.hard_reset().unwrap();

        assert_eq!(
            cycler.sender().backend().written_commands(),
            vec!["WLTVER?", "mobly_test:power_on", "mobly_test:reboot"]
        );
    }

    #[test]
    fn test_unstable_mcu_aborts_before_power_on() {
        let mut cycler = cycler(vec![MockDevice::responding("/dev/hidraw0", "V1.0.1")]);
        let err = cycler.hard_reset().unwrap_err();

        assert!(matches!(err, HidError::UnstableMcuVersion { ref found, .. } if found == "V1.0.1"));
        assert_eq!(cycler.sender().backend().written_commands(), vec!["WLTVER?"]);
    }

    #[test]
    fn test_failed_power_on_is_reported() {
        let mut cycler = cycler(vec![
            MockDevice::responding("/dev/hidraw0", "V1.0.3"),
            MockDevice::silent("/dev/hidraw1"),
        ]);
        let err = cycler.hard_reset().unwrap_err();
        assert!(matches!(err, HidError::ScanFailed { failed: 1, .. }));
    }
}
