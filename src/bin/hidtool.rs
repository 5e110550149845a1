//! Send one command to every HID control port of the attached boards.
//!
//! ```text
//! hidtool WLTVER?
//! ```
//!
//! Exits 0 when every matching device answered (or none is attached) and 1
//! when the command is missing, does not fit in one report, or any device
//! failed. Usage errors also exit 1; extra positional arguments are ignored.

use bt_ref_harness::config::LoggingConfig;
use bt_ref_harness::hid::tool::{self, ToolOptions, EXIT_FAILURE, EXIT_OK};
use bt_ref_harness::hid::HidApiBackend;
use bt_ref_harness::logging;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "hidtool",
    version,
    about = "Send a command to the boards' USB HID control ports",
    after_help = "The command length is checked before devices are scanned: a command \
                  longer than 63 bytes exits 1 even when no device is attached."
)]
struct Args {
    /// Command text, at most 63 bytes
    #[arg(allow_hyphen_values = true)]
    command: Option<String>,

    /// Ignored
    #[arg(hide = true, allow_hyphen_values = true)]
    extra: Vec<String>,

    /// USB vendor ID
    #[arg(long, value_parser = parse_id, default_value = "0x0416")]
    vid: u16,

    /// USB product ID
    #[arg(long, value_parser = parse_id, default_value = "0xC145")]
    pid: u16,

    /// Response timeout per device in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_id(s: &str) -> Result<u16, String> {
    let hex = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(hex, 16).map_err(|e| format!("invalid USB id '{s}': {e}"))
}

/// Parse the command line; `Err` carries the exit status to use instead.
fn parse_args<I, T>(argv: I) -> Result<Args, i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv).map_err(|e| {
        let code = match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
            _ => EXIT_FAILURE,
        };
        let _ = e.print();
        code
    })
}

fn main() {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => std::process::exit(code),
    };
    logging::init(&LoggingConfig::default(), args.verbose);
    if !args.extra.is_empty() {
        tracing::debug!(extra = ?args.extra, "ignoring extra arguments");
    }

    let options = ToolOptions {
        vendor_id: args.vid,
        product_id: args.pid,
        read_timeout: Duration::from_millis(args.timeout_ms),
    };

    let mut stdout = std::io::stdout();
    let code = tool::run(args.command.as_deref(), &options, HidApiBackend::new, &mut stdout);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extra_arguments_are_ignored() {
        let args = parse_args(["hidtool", "WLTVER?", "extra", "more"]).unwrap();

        assert_eq!(args.command.as_deref(), Some("WLTVER?"));
        assert_eq!(args.extra, vec!["extra", "more"]);
    }

    #[test]
    fn test_usage_errors_exit_with_failure() {
        assert_eq!(parse_args(["hidtool", "--vid", "zz", "WLTVER?"]).err(), Some(EXIT_FAILURE));
        assert_eq!(parse_args(["hidtool", "--timeout-ms", "soon"]).err(), Some(EXIT_FAILURE));
    }

    #[test]
    fn test_help_exits_ok() {
        assert_eq!(parse_args(["hidtool", "--help"]).err(), Some(EXIT_OK));
    }

    #[test]
    fn test_defaults() {
        let args = parse_args(["hidtool", "mobly_test:reboot"]).unwrap();

        assert_eq!(args.vid, 0x0416);
        assert_eq!(args.pid, 0xC145);
        assert_eq!(args.timeout_ms, 10_000);
        assert_eq!(args.verbose, 0);
    }
}
