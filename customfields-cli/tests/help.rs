use assert_cmd::cargo::{self};
use predicates::str::contains;

#[test]
fn prints_help() {
    let mut cmd = cargo::cargo_bin_cmd!("customfields");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("customfields"))
        .stdout(contains("serialize"));
}
