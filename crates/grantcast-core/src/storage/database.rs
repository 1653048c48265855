//! SQLite-backed store.
//!
//! Provides persistent storage for:
//! - The program registry
//! - Confirmed windows, one row per (program, year, slot)
//! - Cached forecasts per (program, target year)
//! - Generated alerts

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, ForecastError, Result, ValidationError};
use crate::model::{Alert, Program, WindowKey, WindowRecord, WindowStatus};
use crate::repository::{AlertRepository, CachedForecast, ForecastRepository, ProgramRegistry, WindowStore};

// === Helper Functions ===

fn corrupt(table: &str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: table.to_string(),
        message: message.into(),
    }
}

/// Format a date for database storage
fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a date from database string
fn parse_date(table: &str, s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| corrupt(table, format!("bad date '{s}': {e}")))
}

fn parse_optional_date(table: &str, s: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
    s.map(|s| parse_date(table, &s)).transpose()
}

/// Format a timestamp for database storage
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a timestamp from RFC3339 string
fn parse_datetime(table: &str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{s}': {e}")))
}

const WINDOW_COLUMNS: &str =
    "program_id, year, slot, start_date, end_date, result_date, budget, status, ingested_at";

/// Raw columns of a `windows` row.
struct WindowRow {
    program_id: String,
    year: i32,
    slot: u32,
    start_date: String,
    end_date: Option<String>,
    result_date: Option<String>,
    budget: Option<u64>,
    status: String,
    ingested_at: String,
}

impl WindowRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            program_id: row.get(0)?,
            year: row.get(1)?,
            slot: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            result_date: row.get(5)?,
            budget: row.get(6)?,
            status: row.get(7)?,
            ingested_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<WindowRecord, DatabaseError> {
        let status: WindowStatus = self.status.parse().map_err(|e: ValidationError| corrupt("windows", e.to_string()))?;
        Ok(WindowRecord {
            start_date: parse_date("windows", &self.start_date)?,
            end_date: parse_optional_date("windows", self.end_date)?,
            result_date: parse_optional_date("windows", self.result_date)?,
            ingested_at: parse_datetime("windows", &self.ingested_at)?,
            program_id: self.program_id,
            year: self.year,
            slot: self.slot,
            budget: self.budget,
            status,
        })
    }
}

/// SQLite database implementing every storage trait of the engine.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data dir>/grantcast.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("grantcast.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Custom("database connection mutex poisoned".into()))
    }

    fn query_windows(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<WindowRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, WindowRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .map(WindowRow::into_record)
            .collect::<Result<Vec<_>, DatabaseError>>()?)
    }

    fn update_alert_flag(&self, id: &str, column: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(&format!("UPDATE alerts SET {column} = 1 WHERE id = ?1"), params![id])?;
        if changed == 0 {
            return Err(ValidationError::UnknownAlert(id.to_string()).into());
        }
        Ok(())
    }
}

impl WindowStore for Database {
    fn list_windows(&self, program_id: &str) -> Result<Vec<WindowRecord>> {
        self.query_windows(
            &format!("SELECT {WINDOW_COLUMNS} FROM windows WHERE program_id = ?1 ORDER BY year, slot"),
            params![program_id],
        )
    }

    fn list_windows_since(&self, program_id: &str, since_year: i32) -> Result<Vec<WindowRecord>> {
        self.query_windows(
            &format!(
                "SELECT {WINDOW_COLUMNS} FROM windows WHERE program_id = ?1 AND year >= ?2 ORDER BY year, slot"
            ),
            params![program_id, since_year],
        )
    }

    fn list_windows_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<WindowRecord>> {
        self.query_windows(
            &format!(
                "SELECT {WINDOW_COLUMNS} FROM windows
                 WHERE start_date >= ?1 AND start_date <= ?2
                 ORDER BY start_date, program_id, slot"
            ),
            params![format_date(from), format_date(to)],
        )
    }

    fn all_windows(&self) -> Result<Vec<WindowRecord>> {
        self.query_windows(
            &format!("SELECT {WINDOW_COLUMNS} FROM windows ORDER BY program_id, year, slot"),
            [],
        )
    }

    fn get_window(&self, key: &WindowKey) -> Result<Option<WindowRecord>> {
        let mut rows = self.query_windows(
            &format!("SELECT {WINDOW_COLUMNS} FROM windows WHERE program_id = ?1 AND year = ?2 AND slot = ?3"),
            params![key.program_id, key.year, key.slot],
        )?;
        Ok(rows.pop())
    }

    fn insert_window(&self, record: &WindowRecord) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            &format!("INSERT OR IGNORE INTO windows ({WINDOW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                record.program_id,
                record.year,
                record.slot,
                format_date(record.start_date),
                record.end_date.map(format_date),
                record.result_date.map(format_date),
                record.budget,
                record.status.as_str(),
                format_datetime(record.ingested_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn replace_window(&self, record: &WindowRecord) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE windows
             SET start_date = ?4, end_date = ?5, result_date = ?6, budget = ?7, status = ?8, ingested_at = ?9
             WHERE program_id = ?1 AND year = ?2 AND slot = ?3",
            params![
                record.program_id,
                record.year,
                record.slot,
                format_date(record.start_date),
                record.end_date.map(format_date),
                record.result_date.map(format_date),
                record.budget,
                record.status.as_str(),
                format_datetime(record.ingested_at),
            ],
        )?;
        Ok(changed == 1)
    }

    fn set_status(&self, key: &WindowKey, status: WindowStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE windows SET status = ?4, ingested_at = ?5
             WHERE program_id = ?1 AND year = ?2 AND slot = ?3",
            params![
                key.program_id,
                key.year,
                key.slot,
                status.as_str(),
                format_datetime(Utc::now()),
            ],
        )?;
        if changed == 0 {
            return Err(ValidationError::UnknownWindow(key.clone()).into());
        }
        Ok(())
    }

    fn history_watermark(&self, program_id: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT ingested_at FROM windows WHERE program_id = ?1")?;
        let stamps = stmt
            .query_map(params![program_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut newest: Option<DateTime<Utc>> = None;
        for s in stamps {
            let at = parse_datetime("windows", &s)?;
            newest = newest.max(Some(at));
        }
        Ok(newest)
    }
}

impl ProgramRegistry for Database {
    fn get_program(&self, id: &str) -> Result<Program> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, prep_weeks, success_rate, difficulty, max_amount FROM programs WHERE id = ?1",
            params![id],
            row_to_program,
        )
        .optional()?
        .ok_or_else(|| ForecastError::UnknownProgram(id.to_string()).into())
    }

    fn list_programs(&self) -> Result<Vec<Program>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, prep_weeks, success_rate, difficulty, max_amount FROM programs ORDER BY id",
        )?;
        let programs = stmt
            .query_map([], row_to_program)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(programs)
    }

    fn save_program(&self, program: &Program) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO programs (id, name, prep_weeks, success_rate, difficulty, max_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                program.id,
                program.name,
                program.prep_weeks,
                program.success_rate,
                program.difficulty,
                program.max_amount,
            ],
        )?;
        Ok(())
    }
}

fn row_to_program(row: &rusqlite::Row) -> rusqlite::Result<Program> {
    Ok(Program {
        id: row.get(0)?,
        name: row.get(1)?,
        prep_weeks: row.get(2)?,
        success_rate: row.get(3)?,
        difficulty: row.get(4)?,
        max_amount: row.get(5)?,
    })
}

impl ForecastRepository for Database {
    fn find_forecast(&self, program_id: &str, target_year: i32) -> Result<Option<CachedForecast>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT model_version, watermark, computed_at, forecasts
                 FROM forecast_cache WHERE program_id = ?1 AND target_year = ?2",
                params![program_id, target_year],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((model_version, watermark, computed_at, forecasts)) = row else {
            return Ok(None);
        };
        Ok(Some(CachedForecast {
            program_id: program_id.to_string(),
            target_year,
            model_version,
            watermark: watermark
                .map(|s| parse_datetime("forecast_cache", &s))
                .transpose()?,
            computed_at: parse_datetime("forecast_cache", &computed_at)?,
            forecasts: serde_json::from_str(&forecasts)
                .map_err(|e| corrupt("forecast_cache", e.to_string()))?,
        }))
    }

    fn save_forecast(&self, cached: &CachedForecast) -> Result<()> {
        let forecasts = serde_json::to_string(&cached.forecasts)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO forecast_cache
                (program_id, target_year, model_version, watermark, computed_at, forecasts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                cached.program_id,
                cached.target_year,
                cached.model_version,
                cached.watermark.map(format_datetime),
                format_datetime(cached.computed_at),
                forecasts,
            ],
        )?;
        Ok(())
    }
}

impl AlertRepository for Database {
    fn list_alerts(&self) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, alert_type, priority, program_id, title, message, action,
                    window_start, deadline, is_read, is_dismissed, created_at
             FROM alerts ORDER BY deadline, program_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    (
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ),
                    (
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ),
                    (
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, bool>(9)?,
                        row.get::<_, bool>(10)?,
                        row.get::<_, String>(11)?,
                    ),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut alerts = Vec::with_capacity(rows.len());
        for ((id, alert_type, priority, program_id), (title, message, action), dates) in rows {
            let (window_start, deadline, is_read, is_dismissed, created_at) = dates;
            alerts.push(Alert {
                id,
                alert_type: alert_type
                    .parse()
                    .map_err(|e: ValidationError| corrupt("alerts", e.to_string()))?,
                priority: priority
                    .parse()
                    .map_err(|e: ValidationError| corrupt("alerts", e.to_string()))?,
                program_id,
                title,
                message,
                action,
                window_start: parse_date("alerts", &window_start)?,
                deadline: parse_date("alerts", &deadline)?,
                is_read,
                is_dismissed,
                created_at: parse_datetime("alerts", &created_at)?,
            });
        }
        Ok(alerts)
    }

    fn save_alerts(&self, alerts: &[Alert]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO alerts
                    (id, alert_type, priority, program_id, title, message, action,
                     window_start, deadline, is_read, is_dismissed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for alert in alerts {
                stored += stmt.execute(params![
                    alert.id,
                    alert.alert_type.as_str(),
                    alert.priority.as_str(),
                    alert.program_id,
                    alert.title,
                    alert.message,
                    alert.action,
                    format_date(alert.window_start),
                    format_date(alert.deadline),
                    alert.is_read,
                    alert.is_dismissed,
                    format_datetime(alert.created_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        self.update_alert_flag(id, "is_read")
    }

    fn dismiss(&self, id: &str) -> Result<()> {
        self.update_alert_flag(id, "is_dismissed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertPriority, AlertType, ForecastBasis, ForecastWindow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn programs_round_trip() {
        let db = Database::open_memory().unwrap();
        let p = Program::new("mono", "Manufacturing").with_max_amount(1250).with_difficulty(4);
        db.save_program(&p).unwrap();
        assert_eq!(db.get_program("mono").unwrap(), p);
        assert!(db.get_program("nope").unwrap_err().is_unknown_program());
    }

    #[test]
    fn windows_keep_first_insert() {
        let db = Database::open_memory().unwrap();
        let w = WindowRecord::new("mono", 2024, 1, date(2024, 4, 15))
            .with_end(date(2024, 5, 20))
            .with_budget(500);
        assert!(db.insert_window(&w).unwrap());
        assert!(!db
            .insert_window(&WindowRecord::new("mono", 2024, 1, date(2024, 6, 1)))
            .unwrap());
        let stored = db.get_window(&w.key()).unwrap().unwrap();
        assert_eq!(stored, w);
        assert_eq!(db.history_watermark("mono").unwrap(), Some(w.ingested_at));
    }

    #[test]
    fn replace_window_overwrites_and_since_filters() {
        let db = Database::open_memory().unwrap();
        for year in [2021, 2023, 2024] {
            db.insert_window(&WindowRecord::new("mono", year, 1, date(year, 4, 15)))
                .unwrap();
        }
        let moved = WindowRecord::new("mono", 2024, 1, date(2024, 4, 22)).with_status(WindowStatus::Completed);
        assert!(db.replace_window(&moved).unwrap());
        assert!(!db
            .replace_window(&WindowRecord::new("mono", 2019, 1, date(2019, 4, 1)))
            .unwrap());

        let recent = db.list_windows_since("mono", 2022).unwrap();
        assert_eq!(recent.iter().map(|w| w.year).collect::<Vec<_>>(), vec![2023, 2024]);
        assert_eq!(recent[1], moved);
    }

    #[test]
    fn range_query_is_inclusive() {
        let db = Database::open_memory().unwrap();
        for (slot, day) in [(1, 1), (2, 15), (3, 30)] {
            db.insert_window(&WindowRecord::new("p", 2025, slot, date(2025, 4, day)))
                .unwrap();
        }
        let hits = db.list_windows_between(date(2025, 4, 1), date(2025, 4, 15)).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn status_updates_persist() {
        let db = Database::open_memory().unwrap();
        let w = WindowRecord::new("p", 2025, 1, date(2025, 4, 1));
        db.insert_window(&w).unwrap();
        db.set_status(&w.key(), WindowStatus::Cancelled).unwrap();
        let stored = db.get_window(&w.key()).unwrap().unwrap();
        assert_eq!(stored.status, WindowStatus::Cancelled);
        assert!(stored.ingested_at >= w.ingested_at);
        assert!(db.history_watermark("p").unwrap() >= Some(w.ingested_at));
        assert!(db
            .set_status(&WindowKey::new("p", 2020, 1), WindowStatus::Active)
            .is_err());
    }

    #[test]
    fn forecast_cache_round_trip() {
        let db = Database::open_memory().unwrap();
        let start = date(2025, 4, 15);
        let cached = CachedForecast {
            program_id: "mono".into(),
            target_year: 2025,
            model_version: "historical-v1".into(),
            watermark: Some(Utc::now()),
            computed_at: Utc::now(),
            forecasts: vec![ForecastWindow {
                program_id: "mono".into(),
                year: 2025,
                slot: 1,
                predicted_start: start,
                predicted_end: date(2025, 5, 20),
                predicted_announcement: date(2025, 8, 3),
                confidence: 95,
                probability: 90,
                basis: ForecastBasis::Historical,
                notes: "Based on 3 past window(s) in slot 1".into(),
                sample_count: 3,
                last_occurrence: date(2024, 4, 15),
            }],
        };
        db.save_forecast(&cached).unwrap();
        assert_eq!(db.find_forecast("mono", 2025).unwrap(), Some(cached));
        assert_eq!(db.find_forecast("mono", 2026).unwrap(), None);
    }

    #[test]
    fn alerts_unique_per_key() {
        let db = Database::open_memory().unwrap();
        let alert = Alert {
            id: "a1".into(),
            alert_type: AlertType::PreparationDeadline,
            priority: AlertPriority::High,
            program_id: "mono".into(),
            title: "Prepare".into(),
            message: "10 day(s) left".into(),
            action: "Start".into(),
            window_start: date(2025, 4, 15),
            deadline: date(2025, 2, 18),
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now(),
        };
        let mut twin = alert.clone();
        twin.id = "a2".into();
        assert_eq!(db.save_alerts(&[alert.clone(), twin]).unwrap(), 1);

        db.dismiss("a1").unwrap();
        db.mark_read("a1").unwrap();
        let stored = db.list_alerts().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_dismissed && stored[0].is_read);
        assert_eq!(stored[0].key(), alert.key());
        assert!(db.dismiss("missing").is_err());
    }
}
