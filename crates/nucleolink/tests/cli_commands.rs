#![cfg(all(unix, feature = "cli"))]

use std::process::Command;

fn missing_port() -> String {
    format!(
        "/tmp/nucleolink-missing-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    )
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_nucleolink"))
        .args(["--format", "json", "version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("version should emit json");
    assert_eq!(
        payload.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(payload.get("features").is_some());
}

#[test]
fn ports_emits_json_array() {
    let output = Command::new(env!("CARGO_BIN_EXE_nucleolink"))
        .args(["--format", "json", "ports"])
        .output()
        .expect("ports should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("ports should emit json");
    assert!(payload.is_array());
}

#[test]
fn send_to_missing_port_is_transport_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_nucleolink"))
        .arg("send")
        .arg(missing_port())
        .args(["--command", "1", "--values", "1,48"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
}

#[test]
fn monitor_rejects_reserved_sensor_id() {
    let output = Command::new(env!("CARGO_BIN_EXE_nucleolink"))
        .arg("monitor")
        .arg(missing_port())
        .args(["--sensor", "0xDE:0x10:0:ph"])
        .output()
        .expect("monitor should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn bad_config_file_is_reported() {
    let path = std::env::temp_dir().join(format!(
        "nucleolink-bad-config-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, "{ not json").expect("config should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_nucleolink"))
        .arg("send")
        .arg(missing_port())
        .arg("--config")
        .arg(&path)
        .args(["--command", "0"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(&path);
}
