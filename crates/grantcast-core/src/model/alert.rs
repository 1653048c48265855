use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Program, ProgramId};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PreparationDeadline,
    HighOpportunity,
    NewProgram,
    TrendChange,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PreparationDeadline => "preparation_deadline",
            AlertType::HighOpportunity => "high_opportunity",
            AlertType::NewProgram => "new_program",
            AlertType::TrendChange => "trend_change",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparation_deadline" => Ok(AlertType::PreparationDeadline),
            "high_opportunity" => Ok(AlertType::HighOpportunity),
            "new_program" => Ok(AlertType::NewProgram),
            "trend_change" => Ok(AlertType::TrendChange),
            other => Err(ValidationError::InvalidValue {
                field: "alert_type".into(),
                message: format!("unknown alert type '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            AlertPriority::High => 0,
            AlertPriority::Medium => 1,
            AlertPriority::Low => 2,
        }
    }

    /// Whether `self` is at least as urgent as `other`.
    pub fn at_least(&self, other: AlertPriority) -> bool {
        self.rank() <= other.rank()
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(AlertPriority::High),
            "medium" => Ok(AlertPriority::Medium),
            "low" => Ok(AlertPriority::Low),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("unknown alert priority '{other}'"),
            }),
        }
    }
}

/// De-duplication identity of an alert.
pub type AlertKey = (ProgramId, NaiveDate, AlertType);

/// A notice produced by the alert generator.
///
/// The engine only creates alerts; `is_read` and `is_dismissed` belong to
/// the consuming layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub program_id: ProgramId,
    pub title: String,
    pub message: String,
    pub action: String,
    /// Start of the window the alert is about.
    pub window_start: NaiveDate,
    /// Date the user should act by.
    pub deadline: NaiveDate,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn key(&self) -> AlertKey {
        (self.program_id.clone(), self.window_start, self.alert_type)
    }
}

/// Consumer-side filter for [`crate::ForecastEngine::alerts`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Watch list; empty means every program.
    #[serde(default)]
    pub programs: Vec<ProgramId>,
    #[serde(default)]
    pub max_difficulty: Option<u8>,
    #[serde(default)]
    pub min_amount: Option<u64>,
    #[serde(default)]
    pub min_priority: Option<AlertPriority>,
    #[serde(default)]
    pub include_dismissed: bool,
}

impl UserProfile {
    pub fn matches(&self, alert: &Alert, program: Option<&Program>) -> bool {
        if alert.is_dismissed && !self.include_dismissed {
            return false;
        }
        if !self.programs.is_empty() && !self.programs.contains(&alert.program_id) {
            return false;
        }
        if let Some(min) = self.min_priority {
            if !alert.priority.at_least(min) {
                return false;
            }
        }
        match program {
            Some(p) => {
                self.max_difficulty.map_or(true, |max| p.difficulty <= max)
                    && self.min_amount.map_or(true, |min| p.max_amount >= min)
            }
            // Unknown program: only pass when no program-level filter is set
            None => self.max_difficulty.is_none() && self.min_amount.is_none(),
        }
    }
}
