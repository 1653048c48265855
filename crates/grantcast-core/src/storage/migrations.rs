//! Database schema migrations for grantcast.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version; 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    Ok(conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
        .optional()?
        .unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: programs, confirmed windows and the forecast cache.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS programs (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            prep_weeks   INTEGER NOT NULL,
            success_rate REAL NOT NULL,
            difficulty   INTEGER NOT NULL,
            max_amount   INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS windows (
            program_id   TEXT NOT NULL,
            year         INTEGER NOT NULL,
            slot         INTEGER NOT NULL,
            start_date   TEXT NOT NULL,
            end_date     TEXT,
            result_date  TEXT,
            budget       INTEGER,
            status       TEXT NOT NULL DEFAULT 'scheduled',
            ingested_at  TEXT NOT NULL,
            UNIQUE (program_id, year, slot)
        );

        CREATE TABLE IF NOT EXISTS forecast_cache (
            program_id    TEXT NOT NULL,
            target_year   INTEGER NOT NULL,
            model_version TEXT NOT NULL,
            watermark     TEXT,
            computed_at   TEXT NOT NULL,
            forecasts     TEXT NOT NULL,
            PRIMARY KEY (program_id, target_year)
        );

        CREATE INDEX IF NOT EXISTS idx_windows_start_date ON windows(start_date);
        CREATE INDEX IF NOT EXISTS idx_windows_program ON windows(program_id, year);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: alerts.
///
/// One alert per (program, window start, type), whatever its read or
/// dismissed state.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS alerts (
            id           TEXT PRIMARY KEY,
            alert_type   TEXT NOT NULL,
            priority     TEXT NOT NULL,
            program_id   TEXT NOT NULL,
            title        TEXT NOT NULL,
            message      TEXT NOT NULL,
            action       TEXT NOT NULL DEFAULT '',
            window_start TEXT NOT NULL,
            deadline     TEXT NOT NULL,
            is_read      INTEGER NOT NULL DEFAULT 0,
            is_dismissed INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            UNIQUE (program_id, window_start, alert_type)
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_deadline ON alerts(deadline);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
