//! Integration tests for CLI commands

#![allow(deprecated)]

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

/// Command pointed at an empty config so the user's file never leaks in
fn ruty(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ruty").unwrap();
    cmd.arg("--config").arg(tmp.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("ruty").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("pipe"));
}

#[test]
fn test_resolve_arithmetic() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = ruty(&tmp);
    cmd.arg("resolve").arg("2+2");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"calc-result\""))
        .stdout(predicate::str::contains("= 4"))
        .stdout(predicate::str::contains("\"ai-fallback\""));
}

#[test]
fn test_resolve_slash_lists_commands() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = ruty(&tmp);
    cmd.arg("resolve").arg("/");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("/context"))
        .stdout(predicate::str::contains("/quit"));
}

#[test]
fn test_config_reads_explicit_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        "[input]\ndebounce_ms = 250\n",
    )
    .unwrap();

    let mut cmd = ruty(&tmp);
    cmd.arg("config");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("debounce_ms = 250"))
        .stdout(predicate::str::contains("base_url = \"http://127.0.0.1:3847\""));
}

#[test]
fn test_health_reports_unreachable_backend() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = ruty(&tmp);
    cmd.arg("--backend")
        .arg("http://127.0.0.1:9")
        .arg("health");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not reachable"));
}
