#![allow(clippy::unwrap_used)]
// End-to-end tests for the `kasactl` binary against a fleet spec file.

use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const FLEET: &str = r#"
[[device]]
alias = "Desk Lamp"
host = "10.0.0.11"
cloud = true

[device.emeter]
power = 12.4

[[device]]
alias = "Bench Strip"

[[device.outlet]]
alias = "Soldering Iron"
"#;

fn fleet_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("fleet.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(FLEET.as_bytes()).unwrap();
    path
}

fn kasactl() -> Command {
    let mut cmd = Command::cargo_bin("kasactl").unwrap();
    // Shield the run from ambient configuration.
    cmd.env_remove("KASACTL_PROFILE")
        .env_remove("KASACTL_FLEET")
        .env_remove("KASACTL_OUTPUT");
    cmd
}

#[test]
fn help_lists_the_command_tree() {
    kasactl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("channels").and(predicate::str::contains("set")));
}

#[test]
fn channels_lists_the_enumerated_fleet() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args(["--fleet", fleet.to_str().unwrap(), "-o", "plain", "channels"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Desk Lamp Powered")
                .and(predicate::str::contains("Desk Lamp Cloud"))
                .and(predicate::str::contains("Desk Lamp Power"))
                .and(predicate::str::contains("Soldering Iron")),
        );
}

#[test]
fn devices_lists_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args(["--fleet", fleet.to_str().unwrap(), "-o", "plain", "devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Desk Lamp").and(predicate::str::contains("Bench Strip")));
}

#[test]
fn get_reports_the_initial_state() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args(["--fleet", fleet.to_str().unwrap(), "-o", "plain", "get", "Desk Lamp"])
        .assert()
        .success()
        .stdout("off\n");
}

#[test]
fn set_drives_a_switch_and_confirms() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args([
            "--fleet",
            fleet.to_str().unwrap(),
            "-o",
            "plain",
            "set",
            "Soldering Iron",
            "on",
        ])
        .assert()
        .success()
        .stdout("on\n");
}

#[test]
fn meter_reads_the_gauge() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args([
            "--fleet",
            fleet.to_str().unwrap(),
            "-o",
            "plain",
            "meter",
            "Desk Lamp Power",
        ])
        .assert()
        .success()
        .stdout("12.4\n");
}

#[test]
fn writes_to_read_only_channels_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args([
            "--fleet",
            fleet.to_str().unwrap(),
            "set",
            "Desk Lamp Powered",
            "on",
        ])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("read-only"));
}

#[test]
fn unknown_channels_exit_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args(["--fleet", fleet.to_str().unwrap(), "get", "Garage Door"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn invalid_state_words_are_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet_file(dir.path());

    kasactl()
        .args([
            "--fleet",
            fleet.to_str().unwrap(),
            "set",
            "Desk Lamp",
            "maybe",
        ])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn missing_fleet_spec_is_a_usage_error() {
    kasactl()
        .args(["channels"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("fleet"));
}
