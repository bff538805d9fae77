use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn measurements(content: &str) -> NamedTempFile {
    measurements_bytes(content.as_bytes())
}

fn measurements_bytes(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file
}

fn station_stats() -> Command {
    let mut cmd = Command::cargo_bin("station-stats").unwrap();
    cmd.env("RUST_LOG", "info");
    cmd
}

#[test]
fn prints_sorted_report() {
    let file = measurements("B;20.5\nA;10.0\nA;30.0\n");

    station_stats()
        .arg(file.path())
        .assert()
        .success()
        .stdout("{A=10.0/20.0/30.0, B=20.5/20.5/20.5}\n")
        .stderr(predicate::str::contains("read 2 stations"));
}

#[test]
fn empty_file_gives_empty_report() {
    let file = measurements("");

    station_stats()
        .arg(file.path())
        .assert()
        .code(0)
        .stdout("{}\n");
}

#[test]
fn malformed_reading_aborts() {
    let file = measurements("X;5.5\nY;notanumber\n");

    station_stats()
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("malformed record on line 2"));
}

#[test]
fn missing_delimiter_aborts() {
    let file = measurements("X 5.5\n");

    station_stats()
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_argument() {
    station_stats()
        .assert()
        .code(64)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing input file argument"));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();

    station_stats()
        .arg(dir.path().join("measurements.txt"))
        .assert()
        .code(74)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn invalid_utf8_aborts() {
    let file = measurements_bytes(b"X;5.5\n\xffY;1.0\n");

    station_stats()
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("malformed record on line 2"));
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_stdout() {
    use assert_cmd::cargo::CommandCargoExt;
    use std::{fs::OpenOptions, process};

    let file = measurements("X;5.5\n");
    // Every write to /dev/full fails with ENOSPC
    let full = OpenOptions::new().write(true).open("/dev/full").unwrap();

    let output = process::Command::cargo_bin("station-stats")
        .unwrap()
        .arg(file.path())
        .stdout(full)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(74));
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not write the report"));
}
