//! The `hidtool` command: send one command, print what every device did.
//!
//! Shared by the standalone `hidtool` binary and `bt-ref hid`.

use super::error::HidError;
use super::sender::{HidCommandSender, ScanReport};
use super::traits::HidBackend;
use std::io::{self, Write};
use std::time::Duration;

const SEPARATOR: &str = "===================================";

/// Exit status when nothing went wrong (or no device matched).
pub const EXIT_OK: i32 = 0;
/// Exit status for a missing argument or any failed device.
pub const EXIT_FAILURE: i32 = 1;

/// Options of one tool run.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    pub read_timeout: Duration,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            vendor_id: super::VENDOR_ID,
            product_id: super::PRODUCT_ID,
            read_timeout: super::READ_TIMEOUT,
        }
    }
}

/// Run the tool and return the process exit status.
///
/// `open_backend` is only called once a command is known, so a missing
/// argument never touches the HID library.
pub fn run<B, F, W>(command: Option<&str>, options: &ToolOptions, open_backend: F, out: &mut W) -> i32
where
    B: HidBackend,
    F: FnOnce() -> Result<B, HidError>,
    W: Write,
{
    let Some(command) = command else {
        let _ = writeln!(out, "Requires argument `command`.");
        return EXIT_FAILURE;
    };

    let backend = match open_backend() {
        Ok(backend) => backend,
        Err(e) => {
            let _ = writeln!(out, "{e}");
            return EXIT_FAILURE;
        }
    };

    let mut sender = HidCommandSender::new(backend)
        .with_ids(options.vendor_id, options.product_id)
        .with_read_timeout(options.read_timeout);

    match sender.send(command) {
        Ok(report) => {
            if let Err(e) = print_report(&report, out) {
                tracing::warn!(error = %e, "failed to print HID report");
            }
            report.exit_code()
        }
        Err(e) => {
            let _ = writeln!(out, "{e}");
            EXIT_FAILURE
        }
    }
}

/// Print per-device details followed by a summary of failures.
pub fn print_report<W: Write>(report: &ScanReport, out: &mut W) -> io::Result<()> {
    for outcome in &report.outcomes {
        let device = &outcome.device;
        writeln!(out, "{SEPARATOR}")?;
        writeln!(out, "Open HID device:")?;
        writeln!(out, "  Path = {}", device.path)?;
        writeln!(out, "  Manufacturer String: {}", device.manufacturer.as_deref().unwrap_or("-"))?;
        writeln!(out, "  Product String: {}", device.product.as_deref().unwrap_or("-"))?;
        writeln!(out, "  Serial Number: {}", device.serial_number.as_deref().unwrap_or("-"))?;

        if let Some(written) = outcome.bytes_written {
            writeln!(out, "Write cmd = {}", report.command)?;
            writeln!(out, "HID write length = {written}")?;
        }
        if let Some(response) = &outcome.response {
            writeln!(out, "HID read data: {response}")?;
        }
        if let Some((stage, message)) = &outcome.failure {
            writeln!(out, "HID {stage} failed. Error: {message}")?;
        }
    }

    writeln!(out, "{SEPARATOR}")?;
    writeln!(
        out,
        "{} device(s), {} failed",
        report.outcomes.len(),
        report.failed_count()
    )?;
    for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
        if let Some((stage, _)) = &outcome.failure {
            writeln!(out, "  FAILED {} at {stage}", outcome.device.path)?;
        }
    }
    Ok(())
}
