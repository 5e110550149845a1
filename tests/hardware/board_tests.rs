//! Controller round trips on a real board.
//!
//! ```bash
//! BT_REF_TEST_SERIAL_PORT=/dev/ttyUSB0 BT_REF_TEST_ADDRESS=11:22:33:44:55:66 \
//!     cargo test --test integration_hardware -- --ignored
//! ```

use bt_ref_harness::device::{BesDevice, BesOptions, BluetoothReferenceDevice};

use crate::hardware::utils::{print_available_ports, TestBoardConfig, TimingHelper};

fn open_board() -> Option<BesDevice> {
    let Some(config) = TestBoardConfig::from_env() else {
        println!("⏭️  Skipping: BT_REF_TEST_SERIAL_PORT / BT_REF_TEST_ADDRESS not set");
        print_available_ports();
        return None;
    };
    let timer = TimingHelper::new("open board");
    let device = BesDevice::open(config.device_config(), BesOptions::default()).expect("board init");
    timer.finish();
    Some(device)
}

#[test]
#[ignore] // Requires hardware
fn test_real_board_identity() {
    let Some(mut device) = open_board() else { return };

    let info = device.get_device_info().unwrap();
    assert_eq!(info.bluetooth_address, device.config().bluetooth_address.to_uppercase());
    println!("{info:?}");

    device.destroy().unwrap();
}

#[test]
#[ignore] // Requires hardware
fn test_real_board_reboot() {
    let Some(mut device) = open_board() else { return };

    let timer = TimingHelper::new("reboot");
    device.reboot().unwrap();
    timer.finish();
    println!("firmware: {:?}", device.firmware_version());

    device.destroy().unwrap();
}

#[test]
#[ignore] // Requires hardware
fn test_real_board_battery_and_volume() {
    let Some(mut device) = open_board() else { return };

    device.set_battery_level(42).unwrap();
    assert_eq!(device.get_battery_level().unwrap(), 42);

    device.set_volume(60).unwrap();
    let volume = device.get_volume().unwrap();
    assert!(volume <= 127);

    device.destroy().unwrap();
}

#[test]
#[ignore] // Requires hardware
fn test_real_board_output_excerpt() {
    let Some(mut device) = open_board() else { return };
    let dir = tempfile::tempdir().unwrap();

    let files = device.create_output_excerpts(dir.path()).unwrap();
    assert_eq!(files.len(), 1);
    assert!(std::fs::metadata(&files[0]).unwrap().len() > 0);

    device.destroy().unwrap();
}
