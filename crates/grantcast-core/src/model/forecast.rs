use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ProgramId, WindowKey};

/// What a forecast was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastBasis {
    #[default]
    Historical,
    OfficialAnnouncement,
}

/// A predicted future window. Regenerated, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastWindow {
    pub program_id: ProgramId,
    pub year: i32,
    pub slot: u32,
    pub predicted_start: NaiveDate,
    pub predicted_end: NaiveDate,
    pub predicted_announcement: NaiveDate,
    /// Certainty in the predicted dates (0-100).
    pub confidence: u8,
    /// Certainty that the window opens at all (0-100).
    pub probability: u8,
    pub basis: ForecastBasis,
    pub notes: String,
    /// Number of historical samples behind the pattern.
    pub sample_count: u32,
    /// Most recent observed start, the day-of-month template.
    pub last_occurrence: NaiveDate,
}

impl ForecastWindow {
    pub fn key(&self) -> WindowKey {
        WindowKey::new(self.program_id.clone(), self.year, self.slot)
    }

    /// Days from `today` until the predicted start (negative once it passed).
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.predicted_start - today).num_days()
    }
}
