//! Tests for `src/main.rs` — the CLI help contract.

use assert_cmd::Command;

#[test]
fn help_lists_both_subcommands() {
    let mut cmd = Command::cargo_bin("courier").expect("binary should be built");
    let output = cmd.arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    assert!(stdout.contains("start"), "help must list the start subcommand");
    assert!(stdout.contains("status"), "help must list the status subcommand");
}

#[test]
fn status_requires_a_user_argument() {
    let mut cmd = Command::cargo_bin("courier").expect("binary should be built");
    cmd.arg("status").assert().failure();
}

#[test]
fn version_flag_prints_the_crate_version() {
    let mut cmd = Command::cargo_bin("courier").expect("binary should be built");
    let output = cmd.arg("--version").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
