//! CLI validation contract: misconfiguration must fail before any window,
//! audio device or output file is created, so these run headless.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn percept_cmd() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("percept").unwrap()
}

#[test]
fn rejects_mismatched_tone_lists() {
    let dir = TempDir::new().unwrap();
    percept_cmd()
        .current_dir(dir.path())
        .args(["--output", "run", "--freqs", "440", "500", "--repetitions", "15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1:1"));
    assert!(!dir.path().join("run.csv").exists());
}

#[test]
fn rejects_inverted_delay_bounds() {
    let dir = TempDir::new().unwrap();
    percept_cmd()
        .current_dir(dir.path())
        .args(["--output", "run", "--delay", "200", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inverted"));
    assert!(!dir.path().join("run.csv").exists());
}

#[test]
fn rejects_an_all_zero_tone_set() {
    percept_cmd()
        .args(["--output", "run", "--freqs", "440", "500", "--repetitions", "0", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("zero"));
}

#[test]
fn requires_an_output_name() {
    percept_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

#[test]
fn rejects_a_malformed_port_address() {
    percept_cmd()
        .args(["--output", "run", "--port-address", "0xZZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid port address"));
}

#[test]
fn help_lists_the_flag_set() {
    percept_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--trials"))
        .stdout(predicate::str::contains("--sync-port"))
        .stdout(predicate::str::contains("--port-address"))
        .stdout(predicate::str::contains("--delay"));
}
