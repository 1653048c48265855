//! Calendar aggregation of confirmed and predicted windows.
//!
//! This module provides:
//! - Month buckets ("YYYY-MM") with confirmed and predicted entries kept apart
//! - Suppression of forecasts whose key already has a confirmed window
//! - The "upcoming" list of windows opening within a horizon

mod upcoming;

pub use upcoming::{upcoming, EntryKind, UpcomingEntry};

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{ForecastWindow, Program, ProgramId, WindowKey, WindowRecord, WindowStatus};

/// Calendar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Predicted windows below this confidence stay out of `upcoming`.
    #[serde(default = "default_upcoming_min_confidence")]
    pub upcoming_min_confidence: u8,
    /// Program priority at or above which an entry counts as high priority.
    #[serde(default = "default_high_priority_threshold")]
    pub high_priority_threshold: f64,
}

fn default_upcoming_min_confidence() -> u8 {
    70
}
fn default_high_priority_threshold() -> f64 {
    0.7
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            upcoming_min_confidence: default_upcoming_min_confidence(),
            high_priority_threshold: default_high_priority_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedEntry {
    pub program_id: ProgramId,
    pub program_name: String,
    pub year: i32,
    pub slot: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: WindowStatus,
    /// None once the window has started.
    pub days_until: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedEntry {
    pub program_id: ProgramId,
    pub program_name: String,
    pub year: i32,
    pub slot: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub announcement_date: NaiveDate,
    pub confidence: u8,
    pub probability: u8,
    pub days_until: Option<i64>,
}

/// One month of the calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub confirmed: Vec<ConfirmedEntry>,
    pub predicted: Vec<PredictedEntry>,
    pub total_opportunities: usize,
    pub high_priority_count: usize,
}

/// Month buckets keyed "YYYY-MM", in chronological order.
pub type Calendar = BTreeMap<String, CalendarMonth>;

/// Everything the aggregator looks at.
pub struct CalendarInput<'a> {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub today: NaiveDate,
    pub confirmed: &'a [WindowRecord],
    pub forecasts: &'a [ForecastWindow],
    /// Keys of every confirmed window, in range or not.
    pub confirmed_keys: &'a HashSet<WindowKey>,
    pub programs: &'a HashMap<ProgramId, Program>,
    /// Program priority scores.
    pub priorities: &'a HashMap<ProgramId, f64>,
}

/// Calendar aggregator.
#[derive(Debug, Clone, Default)]
pub struct CalendarAggregator {
    config: CalendarConfig,
}

impl CalendarAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalendarConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// Build the month buckets for `[from, to]` (inclusive).
    ///
    /// # Errors
    /// Returns an error when `to` is before `from`.
    pub fn aggregate(&self, input: &CalendarInput<'_>) -> Result<Calendar, ValidationError> {
        if input.to < input.from {
            return Err(ValidationError::InvalidDateRange {
                start: input.from,
                end: input.to,
            });
        }
        let in_range = |d: NaiveDate| d >= input.from && d <= input.to;
        let mut calendar = Calendar::new();

        for record in input.confirmed.iter().filter(|r| in_range(r.start_date)) {
            let entry = ConfirmedEntry {
                program_id: record.program_id.clone(),
                program_name: program_name(input.programs, &record.program_id),
                year: record.year,
                slot: record.slot,
                start_date: record.start_date,
                end_date: record.end_date,
                status: record.status,
                days_until: days_until(record.start_date, input.today),
            };
            let month = calendar.entry(month_key(record.start_date)).or_default();
            month.confirmed.push(entry);
            self.count(month, input.priorities, &record.program_id);
        }

        let visible = suppress_confirmed(input.forecasts, input.confirmed_keys);
        for forecast in visible.into_iter().filter(|f| in_range(f.predicted_start)) {
            let entry = PredictedEntry {
                program_id: forecast.program_id.clone(),
                program_name: program_name(input.programs, &forecast.program_id),
                year: forecast.year,
                slot: forecast.slot,
                start_date: forecast.predicted_start,
                end_date: forecast.predicted_end,
                announcement_date: forecast.predicted_announcement,
                confidence: forecast.confidence,
                probability: forecast.probability,
                days_until: days_until(forecast.predicted_start, input.today),
            };
            let month = calendar.entry(month_key(forecast.predicted_start)).or_default();
            month.predicted.push(entry);
            self.count(month, input.priorities, &forecast.program_id);
        }

        for month in calendar.values_mut() {
            month.confirmed.sort_by(|a, b| {
                (a.start_date, &a.program_id, a.slot).cmp(&(b.start_date, &b.program_id, b.slot))
            });
            month.predicted.sort_by(|a, b| {
                (a.start_date, &a.program_id, a.slot).cmp(&(b.start_date, &b.program_id, b.slot))
            });
        }
        Ok(calendar)
    }

    fn count(&self, month: &mut CalendarMonth, priorities: &HashMap<ProgramId, f64>, program_id: &str) {
        month.total_opportunities += 1;
        if priorities
            .get(program_id)
            .is_some_and(|&p| p >= self.config.high_priority_threshold)
        {
            month.high_priority_count += 1;
        }
    }
}

/// Drop forecasts whose key has a confirmed window, and duplicate keys.
///
/// The first forecast seen for a key wins.
pub fn suppress_confirmed<'a>(
    forecasts: &'a [ForecastWindow],
    confirmed_keys: &HashSet<WindowKey>,
) -> Vec<&'a ForecastWindow> {
    let mut seen = HashSet::new();
    forecasts
        .iter()
        .filter(|f| {
            let key = f.key();
            !confirmed_keys.contains(&key) && seen.insert(key)
        })
        .collect()
}

/// "YYYY-MM" bucket key for a date.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn days_until(start: NaiveDate, today: NaiveDate) -> Option<i64> {
    (start >= today).then(|| (start - today).num_days())
}

fn program_name(programs: &HashMap<ProgramId, Program>, id: &str) -> String {
    programs
        .get(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}
