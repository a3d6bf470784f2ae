use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const BIN: &str = "bundlewright";

fn bin() -> Command {
    let mut cmd = Command::cargo_bin(BIN).expect("binary should build");
    cmd.env("CI", "true");
    cmd
}

#[test]
fn help_lists_pipeline_commands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PIPELINE COMMANDS"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("explain"));
}

#[test]
fn build_help_shows_example() {
    bin()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example"))
        .stdout(predicate::str::contains("--summary"));
}

#[test]
fn version_flag_prints_version() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn init_then_build_succeeds() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("webapp");

    bin()
        .arg("init")
        .arg(&project)
        .args(["--name", "storefront"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bundlewright project 'storefront'"));

    let summary = dir.path().join("run.json");
    bin()
        .arg("build")
        .arg("--path")
        .arg(&project)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("Task 'build' finished"));

    assert!(project.join("build/compile/index.html").is_file());
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(summary).unwrap()).unwrap();
    assert_eq!(json["target"], "build");
    assert!(json["records"]
        .as_array()
        .unwrap()
        .iter()
        .all(|record| record["status"] == "success"));
}

#[test]
fn validate_reports_bad_pipeline() {
    let dir = TempDir::new().unwrap();
    let pipeline = dir.path().join("bad.yaml");
    fs::write(&pipeline, "version: \"2\"\nsteps: {}\n").unwrap();

    bin()
        .arg("validate")
        .arg("--path")
        .arg(dir.path())
        .arg("--pipeline")
        .arg(&pipeline)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BW-PIPE-002"));
}

#[test]
fn explain_text_lists_task_steps() {
    let dir = TempDir::new().unwrap();
    bin()
        .args(["explain", "cacheBusting", "--format", "text", "--path"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Task: cacheBusting"))
        .stdout(predicate::str::contains("fingerprint.compile"));
}

#[test]
fn unknown_task_fails() {
    let dir = TempDir::new().unwrap();
    bin()
        .args(["build", "deploy", "--path"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("BW-PLAN-001"));
}
