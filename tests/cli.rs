use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn retimer_cmd() -> Command {
    Command::cargo_bin("sakuga-retimer").expect("failed to find sakuga-retimer binary")
}

#[test]
fn test_help_flag() {
    retimer_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("re-timing"));
}

#[test]
fn test_version_flag() {
    retimer_cmd().arg("--version").assert().success();
}

#[test]
fn test_missing_required_args_shows_error() {
    retimer_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_missing_config_source_reports_error_json() {
    retimer_cmd()
        .arg("--input")
        .arg("nonexistent_clip.mp4")
        .arg("--output")
        .arg("out.mp4")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"status\":\"error\""))
        .stderr(predicate::str::contains("ConfigError"));
}

#[test]
fn test_invalid_inline_config_json_reports_error() {
    retimer_cmd()
        .arg("--input")
        .arg("nonexistent_clip.mp4")
        .arg("--output")
        .arg("out.mp4")
        .arg("--config")
        .arg("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"status\":\"error\""));
}

#[test]
fn test_nonexistent_input_file_reports_input_not_found() {
    retimer_cmd()
        .arg("--input")
        .arg("nonexistent_clip.mp4")
        .arg("--output")
        .arg("out.mp4")
        .arg("--config")
        .arg("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"status\":\"error\""))
        .stderr(predicate::str::contains("InputNotFound"));
}

#[test]
fn test_zero_analysis_threads_rejected() {
    retimer_cmd()
        .arg("--input")
        .arg("nonexistent_clip.mp4")
        .arg("--output")
        .arg("out.mp4")
        .arg("--config")
        .arg("{}")
        .arg("--analysis-threads")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("analysis-threads"));
}
