//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

const BATCH: &str = r#"{
    "programs": [
        { "id": "mono", "name": "Manufacturing", "prep_weeks": 6, "success_rate": 0.4, "max_amount": 1250 }
    ],
    "windows": [
        { "program_id": "mono", "year": 2022, "slot": 1, "start_date": "2022-03-14", "end_date": "2022-04-20", "status": "completed" },
        { "program_id": "mono", "year": 2023, "slot": 1, "start_date": "2023-03-10", "end_date": "2023-04-14", "status": "completed" },
        { "program_id": "mono", "year": 2024, "slot": 1, "start_date": "2024-03-12", "end_date": "2024-04-16", "status": "completed" }
    ]
}"#;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_grantcast"))
        .env("GRANTCAST_DATA_DIR", data_dir)
        .env_remove("GRANTCAST_LOG")
        .args(["--today", "2025-01-15"])
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("not JSON ({e}): {stdout}"))
}

fn imported() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let batch = dir.path().join("batch.json");
    std::fs::write(&batch, BATCH).unwrap();
    let (code, stdout, stderr) = run_cli(dir.path(), &["import", batch.to_str().unwrap()]);
    assert_eq!(code, 0, "import failed: {stderr}");
    let summary = json(&stdout);
    assert_eq!(summary["programs_saved"], 1);
    assert_eq!(summary["windows_inserted"], 3);
    dir
}

#[test]
fn test_program_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["program", "add", "it", "IT Adoption", "--prep-weeks", "4"]);
    assert_eq!(code, 0, "program add failed: {stderr}");

    let (code, stdout, _) = run_cli(dir.path(), &["program", "list"]);
    assert_eq!(code, 0);
    let programs = json(&stdout);
    assert_eq!(programs.as_array().unwrap().len(), 1);
    assert_eq!(programs[0]["id"], "it");
    assert_eq!(programs[0]["prep_weeks"], 4);
}

#[test]
fn test_window_add_requires_program() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["window", "add", "ghost", "2024", "1", "--start", "2024-04-01"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_window_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["program", "add", "it", "IT Adoption"]);
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["window", "add", "it", "2024", "1", "--start", "2024-05-20", "--end", "2024-06-30"],
    );
    assert_eq!(code, 0, "window add failed: {stderr}");

    let (code, _, _) = run_cli(dir.path(), &["window", "add", "it", "2024", "1", "--start", "2024-05-20"]);
    assert_ne!(code, 0, "duplicate window must be rejected");

    let (_, stdout, _) = run_cli(dir.path(), &["window", "list", "--program", "it"]);
    let windows = json(&stdout);
    assert_eq!(windows.as_array().unwrap().len(), 1);
    assert_eq!(windows[0]["start_date"], "2024-05-20");
}

#[test]
fn test_forecast_json() {
    let dir = imported();
    let (code, stdout, stderr) = run_cli(dir.path(), &["forecast", "mono", "2025"]);
    assert_eq!(code, 0, "forecast failed: {stderr}");
    let forecasts = json(&stdout);
    let forecasts = forecasts.as_array().unwrap();
    assert_eq!(forecasts.len(), 1);
    assert_eq!(forecasts[0]["predicted_start"], "2025-03-12");
    assert_eq!(forecasts[0]["basis"], "historical");
}

#[test]
fn test_forecast_unknown_program_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(dir.path(), &["forecast", "nope"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_upcoming_lists_predicted_window() {
    let dir = imported();
    let (code, stdout, _) = run_cli(dir.path(), &["upcoming", "--days", "90"]);
    assert_eq!(code, 0);
    let entries = json(&stdout);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["program_id"], "mono");
}

#[test]
fn test_upcoming_rejects_oversized_horizon() {
    let dir = imported();
    let (code, stdout, stderr) = run_cli(dir.path(), &["upcoming", "--days", "4294967295"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("horizon_days"), "stderr: {stderr}");
}

#[test]
fn test_alerts_refresh_then_list() {
    let dir = imported();
    let (code, stdout, stderr) = run_cli(dir.path(), &["alerts", "refresh"]);
    assert_eq!(code, 0, "alerts refresh failed: {stderr}");
    let fresh = json(&stdout);
    assert!(fresh
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["alert_type"] == "preparation_deadline" && a["priority"] == "high"));

    let (_, stdout, _) = run_cli(dir.path(), &["alerts", "refresh"]);
    assert_eq!(json(&stdout).as_array().unwrap().len(), 0);

    let (code, stdout, _) = run_cli(dir.path(), &["alerts", "list", "--min-priority", "high"]);
    assert_eq!(code, 0);
    let listed = json(&stdout);
    let listed = listed.as_array().unwrap();
    assert!(!listed.is_empty());

    let id = listed[0]["id"].as_str().unwrap().to_string();
    let (code, _, _) = run_cli(dir.path(), &["alerts", "dismiss", &id]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["alerts", "list", "--min-priority", "high"]);
    assert!(json(&stdout).as_array().unwrap().iter().all(|a| a["id"] != id.as_str()));
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "upcoming_days"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "90");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "alerts.horizon_days", "60"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "alerts.horizon_days"]);
    assert_eq!(stdout.trim(), "60");

    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_invalid_today_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_grantcast"))
        .env("GRANTCAST_DATA_DIR", dir.path())
        .args(["--today", "15/01/2025", "seasonal"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
