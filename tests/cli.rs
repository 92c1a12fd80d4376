//! End-to-end tests for the `skycam` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn skycam() -> Command {
    let mut cmd = Command::cargo_bin("skycam").unwrap();
    cmd.env_remove("ASI_SDK_LIB").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_no_command_prints_quick_start() {
    skycam()
        .assert()
        .success()
        .stdout(predicate::str::contains("/camera/snapshot"));
}

#[test]
fn test_version_text() {
    skycam()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "skycam {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_json() {
    let output = skycam()
        .args(["version", "--log-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["git_dirty"].is_boolean());
}

#[test]
fn test_probe_mock() {
    skycam()
        .args(["probe", "--mock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ZWO ASI Mock"))
        .stdout(predicate::str::contains("640x480"));
}

#[test]
fn test_probe_mock_json() {
    let output = skycam()
        .args(["probe", "--mock", "--log-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["cameras"][0]["name"], "ZWO ASI Mock");
    assert_eq!(json["cameras"][0]["max_width"], 640);
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.toml");
    skycam()
        .args(["probe", "--mock", "--config"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invalid_config_reports_json_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[camera]\nbandwidth = 400\n").unwrap();

    let output = skycam()
        .args(["probe", "--mock", "--log-format", "json", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().contains("bandwidth"));
    assert_eq!(json["recoverable"], true);
}

#[test]
fn test_completions() {
    skycam()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skycam"));
}
