use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::suppress_confirmed;
use crate::model::{ForecastWindow, ProgramId, WindowKey, WindowRecord, WindowStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Confirmed,
    Predicted,
}

/// A window opening within the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub program_id: ProgramId,
    pub year: i32,
    pub slot: u32,
    pub date: NaiveDate,
    pub days_until: i64,
    /// 100 for confirmed windows.
    pub confidence: u8,
}

/// Windows starting in `[today, today + horizon_days]`, ascending by date.
///
/// Cancelled windows are left out; predicted windows need `min_confidence`.
pub fn upcoming(
    today: NaiveDate,
    horizon_days: u32,
    confirmed: &[WindowRecord],
    forecasts: &[ForecastWindow],
    confirmed_keys: &HashSet<WindowKey>,
    min_confidence: u8,
) -> Vec<UpcomingEntry> {
    let until = today
        .checked_add_days(Days::new(horizon_days as u64))
        .unwrap_or(NaiveDate::MAX);
    let in_horizon = |d: NaiveDate| d >= today && d <= until;

    let confirmed_entries = confirmed
        .iter()
        .filter(|r| r.status != WindowStatus::Cancelled && in_horizon(r.start_date))
        .map(|r| UpcomingEntry {
            kind: EntryKind::Confirmed,
            program_id: r.program_id.clone(),
            year: r.year,
            slot: r.slot,
            date: r.start_date,
            days_until: (r.start_date - today).num_days(),
            confidence: 100,
        });

    let predicted_entries = suppress_confirmed(forecasts, confirmed_keys)
        .into_iter()
        .filter(|f| f.confidence >= min_confidence && in_horizon(f.predicted_start))
        .map(|f| UpcomingEntry {
            kind: EntryKind::Predicted,
            program_id: f.program_id.clone(),
            year: f.year,
            slot: f.slot,
            date: f.predicted_start,
            days_until: f.days_until(today),
            confidence: f.confidence,
        });

    let mut entries: Vec<UpcomingEntry> = confirmed_entries.chain(predicted_entries).collect();
    entries.sort_by(|a, b| {
        (a.date, a.kind, &a.program_id, a.slot).cmp(&(b.date, b.kind, &b.program_id, b.slot))
    });
    entries
}
