use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ProgramId;
use crate::error::ValidationError;

/// Identity of a window: at most one confirmed record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub program_id: ProgramId,
    pub year: i32,
    pub slot: u32,
}

impl WindowKey {
    pub fn new(program_id: impl Into<ProgramId>, year: i32, slot: u32) -> Self {
        Self {
            program_id: program_id.into(),
            year,
            slot,
        }
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.program_id, self.year, self.slot)
    }
}

/// Lifecycle of a confirmed window.
///
/// ```text
/// scheduled -> active -> closed -> completed
///     \          |         /
///      +---> cancelled <--+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    #[default]
    Scheduled,
    Active,
    Closed,
    Completed,
    Cancelled,
}

impl WindowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowStatus::Scheduled => "scheduled",
            WindowStatus::Active => "active",
            WindowStatus::Closed => "closed",
            WindowStatus::Completed => "completed",
            WindowStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled windows never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WindowStatus::Completed | WindowStatus::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: WindowStatus) -> bool {
        use WindowStatus::*;
        match (self, next) {
            (Scheduled, Active) | (Active, Closed) | (Closed, Completed) => true,
            (Scheduled | Active | Closed, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Ok(WindowStatus::Scheduled),
            "active" => Ok(WindowStatus::Active),
            "closed" => Ok(WindowStatus::Closed),
            "completed" => Ok(WindowStatus::Completed),
            "cancelled" | "canceled" => Ok(WindowStatus::Cancelled),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown window status '{other}'"),
            }),
        }
    }
}

/// A confirmed application window sourced from authoritative schedule data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub program_id: ProgramId,
    pub year: i32,
    /// Recurrence ordinal within the year (round 1, round 2, ...).
    pub slot: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub result_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub status: WindowStatus,
    /// When this record entered the store or last changed there.
    #[serde(default = "Utc::now")]
    pub ingested_at: DateTime<Utc>,
}

impl WindowRecord {
    /// Create a scheduled record with only a start date.
    pub fn new(program_id: impl Into<ProgramId>, year: i32, slot: u32, start_date: NaiveDate) -> Self {
        Self {
            program_id: program_id.into(),
            year,
            slot,
            start_date,
            end_date: None,
            result_date: None,
            budget: None,
            status: WindowStatus::Scheduled,
            ingested_at: Utc::now(),
        }
    }

    pub fn with_end(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_result(mut self, result_date: NaiveDate) -> Self {
        self.result_date = Some(result_date);
        self
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_status(mut self, status: WindowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_ingested_at(mut self, at: DateTime<Utc>) -> Self {
        self.ingested_at = at;
        self
    }

    pub fn key(&self) -> WindowKey {
        WindowKey::new(self.program_id.clone(), self.year, self.slot)
    }

    /// Same dates, budget and status; `ingested_at` is ignored.
    pub fn same_content(&self, other: &WindowRecord) -> bool {
        self.key() == other.key()
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.result_date == other.result_date
            && self.budget == other.budget
            && self.status == other.status
    }

    /// Length of the window in days, when the end date is known.
    pub fn duration_days(&self) -> Option<i64> {
        self.end_date.map(|end| (end - self.start_date).num_days())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.slot == 0 {
            return Err(ValidationError::InvalidValue {
                field: "slot".into(),
                message: "slot ordinals start at 1".into(),
            });
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ValidationError::InvalidDateRange {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Move to `next`, rejecting moves the lifecycle does not allow.
    pub fn transition(&mut self, next: WindowStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition {
                key: self.key(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Apply every date-driven transition that is due on `today`.
    ///
    /// Returns true when the status changed.
    pub fn advance(&mut self, today: NaiveDate) -> bool {
        let before = self.status;
        loop {
            let next = match self.status {
                WindowStatus::Scheduled if today >= self.start_date => WindowStatus::Active,
                WindowStatus::Active if self.end_date.is_some_and(|end| today >= end) => {
                    WindowStatus::Closed
                }
                WindowStatus::Closed if self.result_date.is_some_and(|r| today > r) => {
                    WindowStatus::Completed
                }
                _ => break,
            };
            self.status = next;
        }
        self.status != before
    }
}
