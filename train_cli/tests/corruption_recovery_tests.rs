//! Corruption recovery tests for traindaily.
//!
//! These tests verify the system can handle:
//! - Corrupted history files, kept aside when a save replaces them
//! - Individually malformed history entries
//! - Corrupted meta files
//! - Missing files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TUESDAY: &str = "2026-02-17";

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("traindaily"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).expect("Invalid JSON")
}

#[test]
fn test_corrupted_history_is_treated_as_empty() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(data_dir.join("history.json"), "{ invalid json }}}}").unwrap();

    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success()
        .stdout(predicate::str::contains("TRX ROW"));

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions logged yet."));
}

#[test]
fn test_session_saves_over_corrupted_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(data_dir.join("history.json"), "not json at all").unwrap();

    cli()
        .arg("start")
        .arg("--auto")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success();

    let history = read_json(&data_dir.join("history.json"));
    assert_eq!(history.as_object().unwrap().len(), 1);
    assert_eq!(history[TUESDAY]["workout_type"], "pull");

    // The unreadable file is kept beside the new one
    let backups: Vec<_> = fs::read_dir(data_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("history.json.corrupt-"))
        })
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "not json at all");
}

#[test]
fn test_malformed_entries_are_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(
        data_dir.join("history.json"),
        r#"{
            "2026-02-13": {"trx_row": [10, 10], "logged_at": "2026-02-13T07:00:00.000Z", "week_number": 1},
            "last friday": {"trx_row": [1]},
            "2026-02-14": "oops"
        }"#,
    )
    .unwrap();

    // The valid entry still drives progression: avg 10 + 1
    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success()
        .stdout(predicate::str::contains("11 / 11 reps"));

    cli()
        .arg("start")
        .arg("--auto")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success();

    let history = read_json(&data_dir.join("history.json"));
    let dates: Vec<&String> = history.as_object().unwrap().keys().collect();
    assert_eq!(dates, vec!["2026-02-13", TUESDAY]);
    // Legacy record without workout_type survives the rewrite unchanged
    assert!(history["2026-02-13"].get("workout_type").is_none());
    assert_eq!(history["2026-02-13"]["trx_row"], serde_json::json!([10, 10]));
}

#[test]
fn test_binary_garbage_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(data_dir.join("history.json"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions logged yet."));
}

#[test]
fn test_corrupted_meta_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(data_dir.join("meta.json"), "{ invalid json }}}}").unwrap();

    cli()
        .arg("start")
        .arg("--auto")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success()
        .stdout(predicate::str::contains("WEEK 1"));

    let meta = read_json(&data_dir.join("meta.json"));
    assert_eq!(meta["first_session_date"], TUESDAY);
}

#[test]
fn test_missing_data_dir_is_created() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("nested").join("data");

    cli()
        .arg("start")
        .arg("--auto")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--date")
        .arg(TUESDAY)
        .assert()
        .success();

    assert!(data_dir.join("history.json").exists());
    assert!(data_dir.join("meta.json").exists());
}

#[test]
fn test_invalid_config_file_fails() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[schedule]\ncycle = []\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config_path)
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure();
}
