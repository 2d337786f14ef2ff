//! End-to-end tests for CLI exit codes and error reporting.
//!
//! - Exit code 0: Success
//! - Exit code 1: Any error, reported as `deptools: error: <message>`
//! - Exit code 2: Invalid command-line usage (handled by clap)

mod common;
use common::prelude::*;

#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("deptools");
    cmd.arg("--help").assert().code(0);
}

#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("deptools");
    cmd.arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("deptools"));
}

#[test]
fn test_missing_command_is_usage_error() {
    let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);
    fixture.command().assert().code(2);
}

#[test]
fn test_unknown_command_is_usage_error() {
    let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);
    fixture.command().arg("frobnicate").assert().code(2);
}

#[test]
fn test_execute_without_command_is_usage_error() {
    let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);
    fixture.command().arg("execute").assert().code(2);
}

#[test]
fn test_missing_manifest() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with(
            "deptools: error: manifest file not found:",
        ))
        .stderr(predicate::str::contains("hint: Use -f/--file"));
}

#[test]
fn test_hints_follow_single_error_line() {
    let fixture = TestFixture::new();

    let output = fixture.command().arg("list").output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    assert!(lines[0].starts_with("deptools: error: manifest file not found:"));
    assert!(lines.len() > 1);
    assert!(lines[1..]
        .iter()
        .all(|line| line.starts_with("deptools: info: hint: ")));
}

#[test]
fn test_quiet_hides_hints() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["-q", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("manifest file not found"))
        .stderr(predicate::str::contains("hint:").not());
}

#[test]
fn test_invalid_yaml() {
    let fixture = TestFixture::new().with_manifest(manifests::INVALID_YAML);

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn test_dangling_component() {
    let fixture = TestFixture::new().with_manifest(manifests::DANGLING);

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "missing repository for component ghost in configuration default",
        ))
        .stdout("");
}

#[test]
fn test_unknown_format() {
    let fixture = TestFixture::new().with_manifest(manifests::UNKNOWN_FORMAT);

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no plugin found for format 'cvs'"))
        .stderr(predicate::str::contains("hint: Supported formats: git, hg, path, svn, tar"));
}

#[test]
fn test_unknown_configuration() {
    let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);

    fixture
        .command()
        .args(["-c", "release", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing configuration: release"))
        .stderr(predicate::str::contains("hint: Available configurations: default"));
}

#[test]
fn test_unknown_component_filter() {
    let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);

    fixture
        .command()
        .args(["list", "-n", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "component ghost is not in configuration default",
        ));
}

#[test]
fn test_non_string_configuration_entry() {
    let fixture = TestFixture::new().with_manifest(
        "configurations:\n  default: [a, 42]\nrepositories:\n  a: {format: path, repos: /tmp/x}\n",
    );

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("value is not a string"));
}
