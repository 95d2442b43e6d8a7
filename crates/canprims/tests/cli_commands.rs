#![cfg(all(target_os = "linux", feature = "cli"))]

use std::process::{Command, Output, Stdio};

fn canprims(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_canprims"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("canprims should run")
}

#[test]
fn version_prints_package_version() {
    let output = canprims(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("canprims {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_features() {
    let output = canprims(&["version", "--extended"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: canprims"));
    assert!(stdout.contains("features: "));
    assert!(stdout.contains("cli=true"));
}

#[test]
fn malformed_frame_exits_64_without_opening_a_socket() {
    // The interface does not exist; parse errors must win.
    let output = canprims(&["send", "nosuchcan0", "123#XYZ"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid frame"));
}

#[test]
fn oversized_classic_payload_exits_64() {
    let output = canprims(&["send", "vcan0", "123#000102030405060708"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn long_interface_name_exits_64() {
    let output = canprims(&["resolve", "abcdefghijklmnop"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("interface name too long"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = canprims(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[cfg(feature = "vcan_tests")]
mod vcan {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn resolve_prints_index_as_json() {
        let output = canprims(&["--format", "json", "resolve", "vcan0"]);

        assert!(output.status.success());
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("resolve output should be JSON");
        assert_eq!(value["interface"], "vcan0");
        assert!(value["if_index"].as_i64().unwrap_or(0) > 0);
    }

    #[test]
    fn missing_interface_exits_3() {
        let output = canprims(&["resolve", "vcan99"]);
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn listen_prints_sent_frame() {
        let listener = Command::new(env!("CARGO_BIN_EXE_canprims"))
            .args([
                "--log-level",
                "error",
                "--format",
                "json",
                "listen",
                "vcan0",
                "--count",
                "1",
                "--ids",
                "5A5",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("listen should start");

        // Give the listener time to bind before sending.
        thread::sleep(Duration::from_millis(300));
        let sent = canprims(&["send", "vcan0", "5A5#C0FFEE"]);
        assert!(sent.status.success());

        let output = listener.wait_with_output().expect("listen should exit");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("\"id\":\"5A5\""));
        assert!(stdout.contains("\"data\":\"C0FFEE\""));
    }
}
