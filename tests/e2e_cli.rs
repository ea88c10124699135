//! CLI end-to-end tests
//!
//! Tests for the slopvid command-line interface. None of these need ffmpeg:
//! the assemble cases all fail validation before the engine would run.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the slopvid binary
#[allow(deprecated)]
fn slopvid_cmd() -> Command {
    Command::cargo_bin("slopvid").unwrap()
}

fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    slopvid_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    slopvid_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("slopvid"))
        .stdout(predicate::str::contains("assemble"));
}

#[test]
fn test_cli_version_command() {
    slopvid_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("slopvid "));
}

#[test]
fn test_cli_check_tools_command() {
    slopvid_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_start_help() {
    slopvid_cmd()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the HTTP assembly server"));
}

#[test]
fn test_cli_validate_defaults() {
    slopvid_cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Upload ceiling: 33554432 bytes"))
        .stdout(predicate::str::contains("Deadline: 300s"));
}

#[test]
fn test_cli_validate_file_reports_warnings() {
    let dir = tempdir().unwrap();
    let config = write(
        dir.path(),
        "config.json",
        br#"{"server":{"port":9000},"assembly":{"timeout_secs":0},"encoding":{"crf":70}}"#,
    );

    slopvid_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Server: 0.0.0.0:9000"))
        .stdout(predicate::str::contains("timeout_secs is 0"))
        .stdout(predicate::str::contains("crf 70 is out of range"));
}

#[test]
fn test_cli_validate_rejects_unparseable_file() {
    let dir = tempdir().unwrap();
    let config = write(dir.path(), "config.json", b"{ nope");

    slopvid_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn test_cli_assemble_requires_images_and_audio() {
    let dir = tempdir().unwrap();
    let metadata = write(dir.path(), "metadata.json", b"{}");

    slopvid_cmd()
        .arg("assemble")
        .arg("--metadata")
        .arg(&metadata)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn test_cli_assemble_count_mismatch() {
    let dir = tempdir().unwrap();
    let metadata = write(
        dir.path(),
        "metadata.json",
        br#"{"scenes":[{"imageDuration":2},{"imageDuration":3}],"resolution":{"width":640,"height":360},"frameRate":24}"#,
    );
    let image = write(dir.path(), "a.jpg", b"jpeg");
    let audio_a = write(dir.path(), "a.mp3", b"mp3");
    let audio_b = write(dir.path(), "b.mp3", b"mp3");
    let output = dir.path().join("out.mp4");

    slopvid_cmd()
        .arg("assemble")
        .arg("-m")
        .arg(&metadata)
        .arg("-i")
        .arg(&image)
        .arg("-a")
        .arg(&audio_a)
        .arg("-a")
        .arg(&audio_b)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "INVALID_REQUEST: Expected 2 images, got 1",
        ));

    assert!(!output.exists());
}

#[test]
fn test_cli_assemble_bad_metadata() {
    let dir = tempdir().unwrap();
    let metadata = write(dir.path(), "metadata.json", b"not json");
    let image = write(dir.path(), "a.jpg", b"jpeg");
    let audio = write(dir.path(), "a.mp3", b"mp3");

    slopvid_cmd()
        .arg("assemble")
        .arg("-m")
        .arg(&metadata)
        .arg("-i")
        .arg(&image)
        .arg("-a")
        .arg(&audio)
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVALID_METADATA: Invalid metadata JSON"));
}

#[test]
fn test_cli_assemble_missing_input_file() {
    let dir = tempdir().unwrap();
    let metadata = write(dir.path(), "metadata.json", b"{}");

    slopvid_cmd()
        .arg("assemble")
        .arg("-m")
        .arg(&metadata)
        .arg("-i")
        .arg(dir.path().join("absent.jpg"))
        .arg("-a")
        .arg(dir.path().join("absent.mp3"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.jpg"));
}
