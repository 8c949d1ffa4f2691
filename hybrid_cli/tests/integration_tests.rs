//! Integration tests for the hybrid binary.
//!
//! These tests verify end-to-end behavior including:
//! - Week/day navigation and set toggling persisted across invocations
//! - JSON and CSV exports, JSON import
//! - The built-in self-test and the interactive shell

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hybrid"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn saved_state(data_dir: &Path) -> serde_json::Value {
    let content = fs::read_to_string(data_dir.join("hybrid_master_51_v2.json"))
        .expect("Failed to read saved state");
    serde_json::from_str(&content).expect("Saved state is not JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("hybrid"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hybrid Master 51 workout tracker"));
}

#[test]
fn test_default_command_shows_dashboard() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No week selected"))
        .stdout(predicate::str::contains("Volume (kg·rep)"));
}

#[test]
fn test_week_selection_persists() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["week", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 6 selected"));

    cli(data_dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 6/26 (deload)"))
        .stdout(predicate::str::contains("W6 Sunday"));

    let saved = saved_state(data_dir);
    assert_eq!(saved["schemaVersion"], 2);
    assert_eq!(saved["state"]["selectedWeek"], 6);
    assert_eq!(saved["state"]["currentDay"], "sunday");
}

#[test]
fn test_toggle_set_twice() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir).args(["week", "1"]).assert().success();

    cli(data_dir)
        .args(["toggle", "0", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("w1_sunday_ex0_s1 marked done"));
    assert_eq!(
        saved_state(data_dir)["state"]["journal"]["w1_sunday_ex0_s1"]["completed"],
        true
    );

    cli(data_dir)
        .args(["toggle", "0", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marked not done"));
    assert_eq!(
        saved_state(data_dir)["state"]["journal"]["w1_sunday_ex0_s1"]["completed"],
        false
    );
}

#[test]
fn test_toggle_requires_week() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["toggle", "0", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no week selected"));
}

#[test]
fn test_day_switch() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["day", "friday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("select a week"));

    cli(data_dir).args(["week", "2"]).assert().success();
    cli(data_dir)
        .args(["day", "Mardi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tuesday selected"));

    cli(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("W2 Tuesday"))
        .stdout(predicate::str::contains("Hammer Curl (home)"));
}

#[test]
fn test_navigation_boundaries() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("No week selected"));

    cli(data_dir).args(["week", "26"]).assert().success();
    cli(data_dir)
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Program complete"));
    assert_eq!(saved_state(data_dir)["state"]["selectedWeek"], 26);

    cli(data_dir).args(["week", "1"]).assert().success();
    cli(data_dir)
        .arg("prev")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already at week 1"));

    cli(data_dir)
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 2 selected"));
}

#[test]
fn test_week_is_clamped() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["week", "99"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 26 selected"));
}

#[test]
fn test_finish_advances_and_saves() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir).args(["week", "4"]).assert().success();
    cli(data_dir)
        .arg("finish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session saved"))
        .stdout(predicate::str::contains("Now on week 5"));

    assert_eq!(saved_state(data_dir)["state"]["selectedWeek"], 5);
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let csv_path = data_dir.join("out").join("program.csv");

    cli(data_dir)
        .arg("export-csv")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));

    let content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        r#""Semaine","Jour","Exercice","Série","Reps","Poids","Repos","Tempo","RPE""#
    );
    assert_eq!(lines.count(), 26 * 3 * 22 * 3);
}

#[test]
fn test_export_json() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let json_path = data_dir.join("export.json");

    cli(data_dir).args(["week", "3"]).assert().success();
    cli(data_dir)
        .arg("export-json")
        .arg(&json_path)
        .assert()
        .success();

    let content = fs::read_to_string(&json_path).expect("Failed to read export");
    let export: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(export["schemaVersion"], 2);
    assert_eq!(export["state"]["selectedWeek"], 3);
    assert_eq!(export["state"]["weeks"].as_array().unwrap().len(), 26);
}

#[test]
fn test_import_export_between_data_dirs() {
    let source = setup_test_dir();
    let target = setup_test_dir();
    let json_path = source.path().join("export.json");

    cli(source.path()).args(["week", "9"]).assert().success();
    cli(source.path()).args(["toggle", "2", "3"]).assert().success();
    cli(source.path())
        .arg("export-json")
        .arg(&json_path)
        .assert()
        .success();

    cli(target.path())
        .arg("import")
        .arg(&json_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("26 weeks, week 9 selected"));

    let saved = saved_state(target.path());
    assert_eq!(saved["state"]["journal"]["w9_sunday_ex2_s3"]["completed"], true);
}

#[test]
fn test_import_bare_weeks() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let export_path = data_dir.join("export.json");
    let bare_path = data_dir.join("bare.json");

    cli(data_dir)
        .arg("export-json")
        .arg(&export_path)
        .assert()
        .success();
    let export: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    let bare = serde_json::json!({ "weeks": export["state"]["weeks"] });
    fs::write(&bare_path, serde_json::to_vec(&bare).unwrap()).unwrap();

    cli(data_dir)
        .arg("import")
        .arg(&bare_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("26 weeks, week 0 selected"));
}

#[test]
fn test_import_out_of_range_week_is_clamped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let path = data_dir.join("far.json");
    fs::write(&path, r#"{"selectedWeek": 40}"#).unwrap();

    cli(data_dir)
        .arg("import")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("26 weeks, week 26 selected"));

    cli(data_dir)
        .arg("prev")
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 25 selected"));
    cli(data_dir).args(["toggle", "0", "1"]).assert().success();
}

#[test]
fn test_import_invalid_leaves_state() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let bad_path = data_dir.join("bad.json");
    fs::write(&bad_path, "{ not json").unwrap();

    cli(data_dir).args(["week", "7"]).assert().success();
    cli(data_dir)
        .arg("import")
        .arg(&bad_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import error"));

    assert_eq!(saved_state(data_dir)["state"]["selectedWeek"], 7);
}

#[test]
fn test_selftest_passes() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("selftest")
        .assert()
        .success()
        .stdout(predicate::str::contains("SELF-TEST PASS"));
}

#[test]
fn test_stats() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir).args(["week", "1"]).assert().success();
    cli(data_dir).args(["toggle", "0", "2"]).assert().success();
    cli(data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed sets: 1"))
        .stdout(predicate::str::contains("Average RPE:    7.5"));
}

#[test]
fn test_sync_drive_requires_client_id() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("sync-drive")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_custom_storage_key_from_config() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let config_path = data_dir.join("custom.toml");
    fs::write(&config_path, "[storage]\nkey = \"hybrid_master_51\"\n").unwrap();

    cli(data_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["week", "2"])
        .assert()
        .success();

    assert!(data_dir.join("hybrid_master_51.json").exists());
    assert!(!data_dir.join("hybrid_master_51_v2.json").exists());
}

#[test]
fn test_shell_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .arg("shell")
        .write_stdin("week 4\ntoggle 0 1\nstart 0\nglobal start\nbogus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 4 selected"))
        .stdout(predicate::str::contains("w4_sunday_ex0_s1 marked done"))
        .stdout(predicate::str::contains("Exercise 0 rest: 02:00"))
        .stdout(predicate::str::contains("Global: 01:00"));

    assert_eq!(saved_state(data_dir)["state"]["selectedWeek"], 4);
}
