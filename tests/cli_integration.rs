//! CLI integration tests
//!
//! End-to-end tests for CLI commands using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the costgate binary with a clean environment
fn costgate_cmd() -> Command {
    let mut cmd = Command::cargo_bin("costgate").unwrap();
    for var in [
        "COSTGATE_CONFIG",
        "COSTGATE_SUBSCRIPTION_ID",
        "COSTGATE_STATE_PATH",
        "COSTGATE_MEDIA_ADDRESS",
        "COSTGATE_LOG_LEVEL",
        "COSTGATE_LOG_FORMAT",
        "JELLYFIN_API_KEY",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Config that keeps all files inside `dir` and never reaches Azure.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("costgate.toml");
    let content = format!(
        r#"
[budget]
subscription_id = ""
fallback_amount = 150.0

[media_server]
address = "127.0.0.1"
port = 1
timeout_seconds = 2

[runner]
state_path = "{state}"
lock_path = "{lock}"
"#,
        state = dir.join("state.json").display(),
        lock = dir.join("costgate.lock").display(),
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_version_output() {
    costgate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("costgate"));
}

#[test]
fn test_help_shows_all_commands() {
    costgate_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_run_help() {
    costgate_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_status_without_state_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    costgate_cmd()
        .args(["status", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("no state yet"));
}

#[test]
fn test_status_with_unreadable_state_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    std::fs::write(temp_dir.path().join("state.json"), "garbage").unwrap();

    costgate_cmd()
        .args(["status", "--json", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"unreadable\""));
}

#[test]
fn test_status_with_broken_config_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("costgate.toml");
    std::fs::write(&config, "[budget\n").unwrap();

    costgate_cmd()
        .args(["status", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning"));
}

#[test]
fn test_dry_run_decides_without_persisting() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    costgate_cmd()
        .args(["run", "--dry-run", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("dry_run"));

    assert!(!temp_dir.path().join("state.json").exists());
}

#[test]
fn test_run_without_api_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    costgate_cmd()
        .args(["run", "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JELLYFIN_API_KEY"));
}

#[test]
fn test_run_with_unreachable_media_server_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    costgate_cmd()
        .env("JELLYFIN_API_KEY", "key")
        .args(["run", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("apply_failed"));

    assert!(!temp_dir.path().join("state.json").exists());
}

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("costgate.toml");

    costgate_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .success();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[budget]"));
}

#[test]
fn test_config_init_no_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("costgate.toml");
    std::fs::write(&config_path, "existing content").unwrap();

    costgate_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exists"));
}

#[test]
fn test_config_validate_reports_bad_tiers() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("costgate.toml");
    std::fs::write(
        &config_path,
        "[[policy.tiers]]\nname = \"high\"\nmax_percent = 120.0\nbitrate_bps = 1\n",
    )
    .unwrap();

    costgate_cmd()
        .args(["config", "validate", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("policy.tiers[0].max_percent"));
}

#[test]
fn test_invalid_command() {
    costgate_cmd()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    costgate_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete"));
}
