#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::Command;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/meshwire-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn meshwire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_meshwire"));
    cmd.env_remove("MESHWIRE_PORT")
        .env_remove("MESHWIRE_WIFI_PASSWORD")
        .env_remove("MESHWIRE_PSK");
    cmd
}

#[test]
fn version_prints_crate_version() {
    let output = meshwire().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("meshwire {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_defaults() {
    let output = meshwire()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: meshwire"));
    assert!(stdout.contains("defaults: baud=921600 mtu=512 queue=10"));
}

#[test]
fn info_on_missing_port_is_transport_error() {
    let dir = unique_temp_dir("missing-port");
    let missing = dir.join("ttyNOPE");

    let output = meshwire()
        .arg("--log-level")
        .arg("off")
        .arg("info")
        .arg(&missing)
        .arg("--timeout")
        .arg("1s")
        .output()
        .expect("info should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"), "stderr: {stderr}");
}

#[test]
fn invalid_session_config_is_data_invalid() {
    let dir = unique_temp_dir("bad-config");
    let config = dir.join("session.json");
    std::fs::write(&config, r#"{"queue_size": 4}"#).expect("config should be writable");

    let output = meshwire()
        .args(["--log-level", "off", "info", "/dev/null", "--config"])
        .arg(&config)
        .output()
        .expect("info should run");

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn invalid_timeout_is_usage_error() {
    let output = meshwire()
        .args(["info", "/dev/null", "--timeout", "soon"])
        .output()
        .expect("info should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn set_config_without_changes_is_usage_error() {
    let output = meshwire()
        .args(["set-config", "/dev/null"])
        .output()
        .expect("set-config should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nothing to change"));
}

#[test]
fn ports_json_is_an_array() {
    let output = meshwire()
        .args(["--format", "json", "ports"])
        .output()
        .expect("ports should run");

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let ports: serde_json::Value =
            serde_json::from_str(stdout.trim()).expect("ports should emit json");
        assert!(ports.is_array());
    } else {
        assert_eq!(output.status.code(), Some(3));
    }
}
