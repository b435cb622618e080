//! Integration tests for `fleet config` and configuration loading.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `fleet` command whose home and fleet root live in `home`.
fn fleet_in(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleet"));
    cmd.env("NO_COLOR", "1")
        .env("HOME", home.path())
        .env("FLEET_HOME", home.path().join(".fleet"))
        .env_remove("FLEET_CONFIG");
    cmd
}

fn config_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.args(["config", "--json"]).output().expect("run fleet");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("config --json is valid JSON")
}

#[test]
fn test_config_defaults_without_a_file() {
    let home = TempDir::new().expect("tempdir");
    let value = config_json(&mut fleet_in(&home));

    assert_eq!(value["source"], "defaults");
    assert_eq!(value["config"]["network"]["name"], "fleet-net");
    assert_eq!(value["config"]["network"]["prefix"], "172.28");
    assert_eq!(value["config"]["image"]["tag"], "fleet-node:latest");
    assert_eq!(value["config"]["concurrency"], 8);
    assert_eq!(
        value["root"],
        home.path().join(".fleet").display().to_string()
    );
    assert_eq!(
        value["known_hosts"],
        home.path().join(".ssh").join("known_hosts").display().to_string()
    );
}

#[test]
fn test_config_file_in_fleet_root_is_picked_up() {
    let home = TempDir::new().expect("tempdir");
    let root = home.path().join(".fleet");
    std::fs::create_dir_all(&root).expect("create root");
    std::fs::write(
        root.join("config.yaml"),
        "network:\n  prefix: \"10.77\"\nconcurrency: 2\n",
    )
    .expect("write config");

    let value = config_json(&mut fleet_in(&home));

    assert_eq!(value["config"]["network"]["prefix"], "10.77");
    assert_eq!(value["config"]["network"]["name"], "fleet-net");
    assert_eq!(value["config"]["concurrency"], 2);
    assert_ne!(value["source"], "defaults");
}

#[test]
fn test_explicit_config_via_env() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("custom.yaml");
    std::fs::write(&path, "image:\n  tag: \"lab-node:dev\"\n").expect("write config");

    let value = config_json(fleet_in(&home).env("FLEET_CONFIG", &path));

    assert_eq!(value["config"]["image"]["tag"], "lab-node:dev");
    assert_eq!(value["source"], path.display().to_string());
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().expect("tempdir");
    fleet_in(&home)
        .args(["--config", "/nonexistent/fleet.yaml", "config"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_prefix_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("bad.yaml");
    std::fs::write(&path, "network:\n  prefix: \"300.1\"\n").expect("write config");

    fleet_in(&home)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid network prefix '300.1'"));
}

#[test]
fn test_config_error_in_json_mode_is_a_json_object() {
    let home = TempDir::new().expect("tempdir");
    let output = fleet_in(&home)
        .args(["--json", "--config", "/nonexistent/fleet.yaml", "config"])
        .output()
        .expect("run fleet");

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("error is valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "ERROR");
}

#[test]
fn test_config_human_output_lists_settings() {
    let home = TempDir::new().expect("tempdir");
    fleet_in(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in defaults"))
        .stdout(predicate::str::contains("network.prefix:"))
        .stdout(predicate::str::contains("172.28"));
}
