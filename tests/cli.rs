use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("edudata").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("edudata"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn invalid_level_fails_before_any_request() {
    let mut cmd = Command::cargo_bin("edudata").unwrap();
    cmd.args(["get", "universities", "ccd", "enrollment", "--base-url", "http://127.0.0.1:9"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid level"));
}

#[test]
fn malformed_filter_is_reported() {
    let mut cmd = Command::cargo_bin("edudata").unwrap();
    cmd.args(["get", "schools", "ccd", "enrollment", "--filter", "year"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn fetch_online_directory() {
    let mut cmd = Command::cargo_bin("edudata").unwrap();
    cmd.args([
        "get",
        "schools",
        "ccd",
        "directory",
        "--filter",
        "year=2020",
        "--filter",
        "fips=11",
    ]);
    cmd.assert().success();
}
