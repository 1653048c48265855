//! Storage seams of the engine.
//!
//! The engine never talks to SQLite directly. It works against these traits;
//! [`crate::storage::Database`] implements them on disk and [`MemoryStore`]
//! keeps everything in process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ForecastError, Result, ValidationError};
use crate::model::{Alert, ForecastWindow, Program, ProgramId, WindowKey, WindowRecord, WindowStatus};

/// Confirmed window history.
pub trait WindowStore: Send + Sync {
    /// Every window of a program, ordered by (year, slot).
    fn list_windows(&self, program_id: &str) -> Result<Vec<WindowRecord>>;
    /// Windows of a program from `since_year` on.
    fn list_windows_since(&self, program_id: &str, since_year: i32) -> Result<Vec<WindowRecord>> {
        let mut windows = self.list_windows(program_id)?;
        windows.retain(|w| w.year >= since_year);
        Ok(windows)
    }
    /// Windows whose start falls in `[from, to]`.
    fn list_windows_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<WindowRecord>>;
    fn all_windows(&self) -> Result<Vec<WindowRecord>>;
    fn get_window(&self, key: &WindowKey) -> Result<Option<WindowRecord>>;
    /// Insert a new window. Returns false when the key already exists;
    /// existing records are never overwritten.
    fn insert_window(&self, record: &WindowRecord) -> Result<bool>;
    /// Overwrite the record stored under the same key. Returns false when
    /// there is none.
    fn replace_window(&self, record: &WindowRecord) -> Result<bool>;
    /// Persist a status change already validated by the caller. Stamps
    /// `ingested_at` with the current time so cached forecasts go stale.
    fn set_status(&self, key: &WindowKey, status: WindowStatus) -> Result<()>;
    /// Newest `ingested_at` among a program's windows.
    fn history_watermark(&self, program_id: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Program registry.
pub trait ProgramRegistry: Send + Sync {
    /// # Errors
    /// [`ForecastError::UnknownProgram`] when the id is not registered.
    fn get_program(&self, id: &str) -> Result<Program>;
    fn list_programs(&self) -> Result<Vec<Program>>;
    /// Insert or replace.
    fn save_program(&self, program: &Program) -> Result<()>;
}

/// A stored forecasting result for one (program, target year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedForecast {
    pub program_id: ProgramId,
    pub target_year: i32,
    pub model_version: String,
    /// History watermark the forecast was computed from.
    pub watermark: Option<DateTime<Utc>>,
    pub computed_at: DateTime<Utc>,
    pub forecasts: Vec<ForecastWindow>,
}

/// Forecast cache.
pub trait ForecastRepository: Send + Sync {
    fn find_forecast(&self, program_id: &str, target_year: i32) -> Result<Option<CachedForecast>>;
    /// Replace the entry for the same (program, target year).
    fn save_forecast(&self, cached: &CachedForecast) -> Result<()>;
}

/// Alert store.
pub trait AlertRepository: Send + Sync {
    fn list_alerts(&self) -> Result<Vec<Alert>>;
    /// Store new alerts, skipping any whose key is already present.
    /// Returns how many were stored.
    fn save_alerts(&self, alerts: &[Alert]) -> Result<usize>;
    fn mark_read(&self, id: &str) -> Result<()>;
    fn dismiss(&self, id: &str) -> Result<()>;
}

/// Everything the engine needs from storage.
pub trait Store: WindowStore + ProgramRegistry + ForecastRepository + AlertRepository {}

impl<T> Store for T where T: WindowStore + ProgramRegistry + ForecastRepository + AlertRepository {}

#[derive(Debug, Default)]
struct MemoryState {
    programs: BTreeMap<ProgramId, Program>,
    windows: BTreeMap<WindowKey, WindowRecord>,
    forecasts: HashMap<(ProgramId, i32), CachedForecast>,
    alerts: Vec<Alert>,
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| CoreError::Custom(format!("memory store lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| CoreError::Custom(format!("memory store lock poisoned: {e}")))
    }

    fn update_alert(&self, id: &str, f: impl FnOnce(&mut Alert)) -> Result<()> {
        let mut state = self.write()?;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ValidationError::UnknownAlert(id.to_string()))?;
        f(alert);
        Ok(())
    }
}

impl WindowStore for MemoryStore {
    fn list_windows(&self, program_id: &str) -> Result<Vec<WindowRecord>> {
        Ok(self
            .read()?
            .windows
            .values()
            .filter(|w| w.program_id == program_id)
            .cloned()
            .collect())
    }

    fn list_windows_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<WindowRecord>> {
        Ok(self
            .read()?
            .windows
            .values()
            .filter(|w| w.start_date >= from && w.start_date <= to)
            .cloned()
            .collect())
    }

    fn all_windows(&self) -> Result<Vec<WindowRecord>> {
        Ok(self.read()?.windows.values().cloned().collect())
    }

    fn get_window(&self, key: &WindowKey) -> Result<Option<WindowRecord>> {
        Ok(self.read()?.windows.get(key).cloned())
    }

    fn insert_window(&self, record: &WindowRecord) -> Result<bool> {
        let mut state = self.write()?;
        let key = record.key();
        if state.windows.contains_key(&key) {
            return Ok(false);
        }
        state.windows.insert(key, record.clone());
        Ok(true)
    }

    fn replace_window(&self, record: &WindowRecord) -> Result<bool> {
        let mut state = self.write()?;
        match state.windows.get_mut(&record.key()) {
            Some(stored) => {
                *stored = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_status(&self, key: &WindowKey, status: WindowStatus) -> Result<()> {
        let mut state = self.write()?;
        let record = state
            .windows
            .get_mut(key)
            .ok_or_else(|| ValidationError::UnknownWindow(key.clone()))?;
        record.status = status;
        record.ingested_at = Utc::now();
        Ok(())
    }

    fn history_watermark(&self, program_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .read()?
            .windows
            .values()
            .filter(|w| w.program_id == program_id)
            .map(|w| w.ingested_at)
            .max())
    }
}

impl ProgramRegistry for MemoryStore {
    fn get_program(&self, id: &str) -> Result<Program> {
        self.read()?
            .programs
            .get(id)
            .cloned()
            .ok_or_else(|| ForecastError::UnknownProgram(id.to_string()).into())
    }

    fn list_programs(&self) -> Result<Vec<Program>> {
        Ok(self.read()?.programs.values().cloned().collect())
    }

    fn save_program(&self, program: &Program) -> Result<()> {
        self.write()?
            .programs
            .insert(program.id.clone(), program.clone());
        Ok(())
    }
}

impl ForecastRepository for MemoryStore {
    fn find_forecast(&self, program_id: &str, target_year: i32) -> Result<Option<CachedForecast>> {
        Ok(self
            .read()?
            .forecasts
            .get(&(program_id.to_string(), target_year))
            .cloned())
    }

    fn save_forecast(&self, cached: &CachedForecast) -> Result<()> {
        self.write()?
            .forecasts
            .insert((cached.program_id.clone(), cached.target_year), cached.clone());
        Ok(())
    }
}

impl AlertRepository for MemoryStore {
    fn list_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.read()?.alerts.clone())
    }

    fn save_alerts(&self, alerts: &[Alert]) -> Result<usize> {
        let mut state = self.write()?;
        let mut stored = 0;
        for alert in alerts {
            let key = alert.key();
            if state.alerts.iter().any(|a| a.key() == key) {
                continue;
            }
            state.alerts.push(alert.clone());
            stored += 1;
        }
        Ok(stored)
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        self.update_alert(id, |a| a.is_read = true)
    }

    fn dismiss(&self, id: &str) -> Result<()> {
        self.update_alert(id, |a| a.is_dismissed = true)
    }
}
