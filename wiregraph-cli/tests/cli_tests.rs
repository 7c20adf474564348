//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the wiregraph-cli binary.
fn wiregraph_cli() -> Command {
    cargo_bin_cmd!("wiregraph-cli")
}

/// Path to the library's test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("wiregraph")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = wiregraph_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("connectivity"));
}

#[test]
fn test_cli_version() {
    let mut cmd = wiregraph_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_normalize_human() {
    let mut cmd = wiregraph_cli();
    let path = fixtures_dir().join("messy.json");

    cmd.arg("normalize").arg(path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Segments: 6 -> 2"));
}

#[test]
fn test_cli_normalize_already_clean() {
    let mut cmd = wiregraph_cli();
    let path = fixtures_dir().join("acyclic.json");

    cmd.arg("normalize").arg(path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Already normalized"));
}

#[test]
fn test_cli_normalize_json_to_stdout() {
    let mut cmd = wiregraph_cli();
    let path = fixtures_dir().join("messy.json");

    let output = cmd
        .arg("normalize")
        .arg(path)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["nets"].as_array().unwrap().len(), 2);
    assert_eq!(doc["pins"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_normalize_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clean.json");
    let mut cmd = wiregraph_cli();

    cmd.arg("normalize")
        .arg(fixtures_dir().join("messy.json"))
        .arg("-o")
        .arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Written to"));

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"SIG\""));

    // a normalized file normalizes to itself
    let mut again = wiregraph_cli();
    again.arg("normalize").arg(&out);
    again
        .assert()
        .success()
        .stdout(predicate::str::contains("Already normalized"));
}

#[test]
fn test_cli_normalize_drop_labels() {
    let mut cmd = wiregraph_cli();
    let output = cmd
        .arg("normalize")
        .arg(fixtures_dir().join("acyclic.json"))
        .arg("--format")
        .arg("json")
        .arg("--drop-labels")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(!text.contains("\"label\""));
}

#[test]
fn test_cli_nets() {
    let mut cmd = wiregraph_cli();

    cmd.arg("nets").arg(fixtures_dir().join("acyclic.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3 nets"))
        .stdout(predicate::str::contains("VIN"))
        .stdout(predicate::str::contains("R1:2, R2:1"));
}

#[test]
fn test_cli_nets_json() {
    let mut cmd = wiregraph_cli();
    let output = cmd
        .arg("nets")
        .arg(fixtures_dir().join("cyclic.json"))
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let nets = report["nets"].as_array().unwrap();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0]["name"], "Net-5");
    assert_eq!(nets[0]["edge_count"], 4);
}

#[test]
fn test_cli_unknown_pin_fails() {
    let mut cmd = wiregraph_cli();

    cmd.arg("normalize").arg(fixtures_dir().join("unknown_pin.json"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("U7:4"));
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = wiregraph_cli();

    cmd.arg("nets").arg("does-not-exist.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_cli_rules() {
    let mut cmd = wiregraph_cli();

    cmd.arg("rules").arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("merge_coincident"))
        .stdout(predicate::str::contains("assign_clusters"))
        .stdout(predicate::str::contains("seams"));
}
