//! HID control port of a real board.
//!
//! ```bash
//! cargo test --test integration_hardware -- --ignored hid
//! ```

use bt_ref_harness::hid::tool::{run, ToolOptions};
use bt_ref_harness::hid::{HidApiBackend, HidCommandSender};

#[test]
#[ignore] // Requires hardware
fn test_real_hid_version_query() {
    let backend = match HidApiBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            println!("⏭️  Skipping: {e}");
            return;
        }
    };

    let report = HidCommandSender::new(backend).send("WLTVER?").unwrap();
    for outcome in &report.outcomes {
        println!("{} -> {:?}", outcome.device.path, outcome.response);
    }
    assert!(report.is_success(), "{report:?}");
}

#[test]
#[ignore] // Requires hardware
fn test_real_hid_tool_exit_code() {
    let mut out = Vec::new();

    let code = run(Some("WLTVER?"), &ToolOptions::default(), HidApiBackend::new, &mut out);

    println!("{}", String::from_utf8_lossy(&out));
    assert_eq!(code, 0);
}
