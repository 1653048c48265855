//! Integration tests for the SQLite-backed engine.
//!
//! These tests open a database file in a temp directory, run the pipeline
//! against it, and reopen it to check what persisted.

use chrono::NaiveDate;
use grantcast_core::repository::{ForecastRepository, WindowStore};
use grantcast_core::{
    AlertPriority, AlertType, Database, EngineConfig, ForecastEngine, ImportBatch, PipelineEvent, Program, UserProfile, WindowKey,
    WindowRecord, WindowStatus,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const BATCH: &str = r#"{
    "programs": [
        { "id": "mono", "name": "Manufacturing", "prep_weeks": 6, "success_rate": 0.4, "max_amount": 1250 },
        { "id": "it", "name": "IT Adoption", "prep_weeks": 4 }
    ],
    "windows": [
        { "program_id": "mono", "year": 2022, "slot": 1, "start_date": "2022-03-14", "end_date": "2022-04-20", "status": "completed" },
        { "program_id": "mono", "year": 2023, "slot": 1, "start_date": "2023-03-10", "end_date": "2023-04-14", "status": "completed" },
        { "program_id": "mono", "year": 2024, "slot": 1, "start_date": "2024-03-12", "end_date": "2024-04-16", "status": "completed" },
        { "program_id": "mono", "year": 2024, "slot": 2, "start_date": "2024-09-02", "end_date": "2024-10-07", "status": "completed" },
        { "program_id": "it", "year": 2024, "slot": 1, "start_date": "2024-05-20", "status": "completed" }
    ]
}"#;

fn open(dir: &tempfile::TempDir, today: NaiveDate) -> ForecastEngine<Database> {
    let db = Database::open_at(&dir.path().join("grantcast.db")).unwrap();
    ForecastEngine::new(db, EngineConfig::default()).with_today(today)
}

#[test]
fn import_then_forecast_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let today = date(2025, 1, 15);
    {
        let engine = open(&dir, today);
        let summary = engine.ingest(&ImportBatch::from_json(BATCH).unwrap()).unwrap();
        assert_eq!(summary.programs_saved, 2);
        assert_eq!(summary.windows_inserted, 5);

        let forecasts = engine.forecast("mono", 2025).unwrap();
        assert_eq!(forecasts.len(), 2);
        assert_eq!(forecasts[0].predicted_start, date(2025, 3, 12));
        assert_eq!(forecasts[1].predicted_start, date(2025, 9, 2));
    }

    let engine = open(&dir, today);
    let cached = engine.store().find_forecast("mono", 2025).unwrap().unwrap();
    assert_eq!(cached.forecasts.len(), 2);
    let run = engine.forecast_run("mono", 2025).unwrap();
    assert!(run.events.iter().any(|e| matches!(e, PipelineEvent::CacheHit { .. })));
    assert_eq!(run.windows, cached.forecasts);
}

#[test]
fn reimport_skips_existing_windows() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(&dir, date(2025, 1, 15));
    let batch = ImportBatch::from_json(BATCH).unwrap();
    engine.ingest(&batch).unwrap();
    let again = engine.ingest(&batch).unwrap();
    assert_eq!(again.windows_inserted, 0);
    assert_eq!(again.windows_skipped, 5);
    assert_eq!(engine.windows(None).unwrap().len(), 5);
}

#[test]
fn status_lifecycle_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let today = date(2025, 3, 20);
    let engine = open(&dir, today);
    engine.add_program(&Program::new("mono", "Manufacturing")).unwrap();
    let record = WindowRecord::new("mono", 2025, 1, date(2025, 3, 12))
        .with_end(date(2025, 4, 16))
        .with_result(date(2025, 6, 30));
    engine.add_window(&record).unwrap();

    let changed = engine.advance_statuses().unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].status, WindowStatus::Active);

    let key = WindowKey::new("mono", 2025, 1);
    engine.update_status(&key, WindowStatus::Cancelled).unwrap();
    assert!(engine.update_status(&key, WindowStatus::Active).is_err());

    let reopened = open(&dir, today);
    let stored = reopened.store().get_window(&key).unwrap().unwrap();
    assert_eq!(stored.status, WindowStatus::Cancelled);
}

#[test]
fn alerts_persist_and_respect_profile() {
    let dir = tempfile::tempdir().unwrap();
    // mono predicted 2025-03-12, six weeks of preparation: deadline 2025-01-29
    let today = date(2025, 1, 15);
    {
        let engine = open(&dir, today);
        engine.ingest(&ImportBatch::from_json(BATCH).unwrap()).unwrap();
        let created = engine.refresh_alerts().unwrap();
        assert!(!created.is_empty());
        assert!(created.iter().any(|a| a.alert_type == AlertType::PreparationDeadline
            && a.priority == AlertPriority::High
            && a.deadline == date(2025, 1, 29)));
        assert!(created.iter().any(|a| a.alert_type == AlertType::NewProgram && a.program_id == "it"));
    }

    let engine = open(&dir, today);
    assert!(engine.refresh_alerts().unwrap().is_empty());

    let all = engine.alerts(None).unwrap();
    let only_it = UserProfile {
        programs: vec!["it".into()],
        ..Default::default()
    };
    let filtered = engine.alerts(Some(&only_it)).unwrap();
    assert!(filtered.iter().all(|a| a.program_id == "it"));
    assert!(filtered.len() < all.len());

    engine.dismiss_alert(&all[0].id).unwrap();
    assert_eq!(engine.alerts(None).unwrap().len(), all.len() - 1);
    let with_dismissed = UserProfile {
        include_dismissed: true,
        ..Default::default()
    };
    assert_eq!(engine.alerts(Some(&with_dismissed)).unwrap().len(), all.len());
}

#[test]
fn recompute_all_refreshes_every_program() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(&dir, date(2025, 1, 15));
    engine.ingest(&ImportBatch::from_json(BATCH).unwrap()).unwrap();
    let report = engine.recompute_all(2025).unwrap();
    assert_eq!(report.programs, 2);
    assert_eq!(report.forecasts, 3);
    assert!(report.skipped.is_empty());
    assert!(engine.store().find_forecast("it", 2025).unwrap().is_some());
}
