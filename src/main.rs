//! `bt-ref`: operator CLI of the Bluetooth reference-device harness.

use bt_ref_harness::config::{ConfigLoader, DeviceConfig, HarnessConfig, TestBed, TestBedFile};
use bt_ref_harness::device::{bes, registry, BesOptions, ControllerRegistry, DeviceBox};
use bt_ref_harness::{logging, HarnessResult};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "bt-ref",
    version,
    about = "Hardware-in-the-loop harness for Bluetooth reference boards",
    long_about = "Validates test-bed files, queries reference boards over their serial link and \
                  drives the boards' USB HID control port."
)]
struct Cli {
    /// Harness configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one command to every HID control port
    #[cfg(feature = "hidraw")]
    Hid {
        #[arg(allow_hyphen_values = true)]
        command: Option<String>,
    },

    /// Power-cycle the attached boards over HID
    #[cfg(feature = "hidraw")]
    HardReset,

    /// Validate a test-bed file
    CheckTestbed {
        file: PathBuf,
        /// Print the parsed test beds as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect to the reference devices of a test bed and print their identity
    DeviceInfo {
        file: PathBuf,
        /// Test bed name; the first one when omitted
        #[arg(long)]
        testbed: Option<String>,
    },

    /// Print the effective harness configuration
    ShowConfig,
}

fn load_config(path: Option<&Path>) -> HarnessResult<ConfigLoader> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    })
}

fn check_testbed(file: &Path, as_json: bool) -> HarnessResult<()> {
    let testbeds = TestBedFile::load(file)?;
    let mut summary = Vec::new();

    for bed in &testbeds.test_beds {
        let reference = bed
            .controllers
            .reference_devices
            .iter()
            .map(|raw| {
                let config = DeviceConfig::from_raw(raw)?;
                if config.controller_name.is_none() {
                    return Err(bt_ref_harness::ConfigError::MissingRequired(
                        "controller_name".to_string(),
                    ));
                }
                Ok(config)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let bes_devices = bed
            .controllers
            .bes_devices
            .iter()
            .map(DeviceConfig::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        summary.push(json!({
            "name": bed.name,
            "android_devices": bed.controllers.android_devices,
            "reference_devices": reference,
            "bes_devices": bes_devices,
        }));
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for bed in &testbeds.test_beds {
            println!(
                "{}: {} reference device(s), {} BES device(s)",
                bed.name,
                bed.controllers.reference_devices.len(),
                bed.controllers.bes_devices.len()
            );
        }
        println!("OK");
    }
    Ok(())
}

fn open_devices(bed: &TestBed, config: &HarnessConfig) -> HarnessResult<Vec<DeviceBox>> {
    let options = BesOptions::from_config(config);
    let mut devices = Vec::new();

    if !bed.controllers.reference_devices.is_empty() {
        let registry = ControllerRegistry::with_defaults(options.clone());
        devices.extend(registry.create(&bed.controllers.reference_devices)?);
    }
    if !bed.controllers.bes_devices.is_empty() {
        for device in bes::create(&bed.controllers.bes_devices, &options)? {
            devices.push(Box::new(device));
        }
    }
    Ok(devices)
}

fn device_info(file: &Path, testbed: Option<&str>, config: &HarnessConfig) -> HarnessResult<()> {
    let testbeds = TestBedFile::load(file)?;
    let bed = testbeds.test_bed(testbed)?;
    let mut devices = open_devices(bed, config)?;

    let mut report = Vec::new();
    let mut failure = None;
    for device in devices.iter_mut() {
        match device.get_device_info() {
            Ok(info) => report.push(json!({ "device": device.debug_tag(), "info": info })),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    let details = registry::get_info(&devices);
    registry::destroy(&mut devices);

    if let Some(e) = failure {
        return Err(e.into());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "devices": report, "details": details }))?
    );
    Ok(())
}

#[cfg(feature = "hidraw")]
fn hard_reset(config: &HarnessConfig) -> HarnessResult<()> {
    use bt_ref_harness::hid::HardReset;

    config.hid.local_hard_reset().hard_reset()?;
    println!("Hard reset finished");
    Ok(())
}

fn run(cli: Cli) -> HarnessResult<ExitCode> {
    let loader = load_config(cli.config.as_deref())?;
    logging::init(&loader.config().logging, cli.verbose);
    tracing::debug!(path = ?loader.config_path, "configuration loaded");
    let config = loader.config();

    match cli.command {
        #[cfg(feature = "hidraw")]
        Command::Hid { command } => {
            let code = bt_ref_harness::hid::tool::run(
                command.as_deref(),
                &config.hid.tool_options(),
                bt_ref_harness::hid::HidApiBackend::new,
                &mut std::io::stdout(),
            );
            return Ok(ExitCode::from(code as u8));
        }
        #[cfg(feature = "hidraw")]
        Command::HardReset => hard_reset(config)?,
        Command::CheckTestbed { file, json } => check_testbed(&file, json)?,
        Command::DeviceInfo { file, testbed } => device_info(&file, testbed.as_deref(), config)?,
        Command::ShowConfig => print!("{}", loader.to_toml()?),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
