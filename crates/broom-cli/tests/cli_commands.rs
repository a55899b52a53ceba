//! Integration tests for the CLI subcommands.
#![allow(deprecated)] // Command::cargo_bin, macro replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

fn broomtable() -> Command {
    Command::cargo_bin("broomtable").unwrap()
}

#[test]
fn demo_walks_the_scripted_table() {
    broomtable()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Brooms Night"))
        .stdout(predicate::str::contains("Billy"))
        .stdout(predicate::str::contains("Hazel"))
        .stdout(predicate::str::contains("Adversity Tokens"));
}

#[test]
fn demo_surfaces_a_confirmation_prompt() {
    broomtable()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("wants to spend"));
}

#[test]
fn simulate_reports_consistency() {
    broomtable()
        .args(["simulate", "--seed", "7", "--actions", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed=7"))
        .stdout(predicate::str::contains(
            "all replicas agree with ground truth",
        ));
}

#[test]
fn simulate_is_reproducible() {
    let first = broomtable()
        .args(["simulate", "--seed", "11"])
        .assert()
        .success();
    let second = broomtable()
        .args(["simulate", "--seed", "11"])
        .assert()
        .success();
    assert_eq!(
        first.get_output().stdout,
        second.get_output().stdout
    );
}

#[test]
fn unknown_subcommand_fails() {
    broomtable()
        .arg("shuffle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
