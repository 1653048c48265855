//! Deadline and opportunity alert generation.
//!
//! Each upcoming window (confirmed or predicted) gets a preparation deadline:
//! its start minus the program's preparation lead time. Alerts fire on
//! thresholds over that deadline, the window's confidence, and the program's
//! success record. Generation is de-duplicated on
//! (program, window start, alert type) against every stored alert.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::EntryKind;
use crate::model::{Alert, AlertKey, AlertPriority, AlertType, Program, ProgramId};
use crate::trend::Trend;

/// Alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Preparation deadlines this close (in days) raise an alert.
    #[serde(default = "default_deadline_window_days")]
    pub deadline_window_days: i64,
    /// Deadlines this close are high priority.
    #[serde(default = "default_high_priority_days")]
    pub high_priority_days: i64,
    /// Minimum window confidence for a deadline alert.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    #[serde(default = "default_high_opportunity_confidence")]
    pub high_opportunity_confidence: u8,
    /// Minimum of success_rate x probability for a high-opportunity alert.
    #[serde(default = "default_success_score_threshold")]
    pub success_score_threshold: f64,
    /// Only windows opening within this many days are considered.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

fn default_deadline_window_days() -> i64 {
    30
}
fn default_high_priority_days() -> i64 {
    14
}
fn default_min_confidence() -> u8 {
    60
}
fn default_high_opportunity_confidence() -> u8 {
    80
}
fn default_success_score_threshold() -> f64 {
    30.0
}
fn default_horizon_days() -> u32 {
    180
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            deadline_window_days: default_deadline_window_days(),
            high_priority_days: default_high_priority_days(),
            min_confidence: default_min_confidence(),
            high_opportunity_confidence: default_high_opportunity_confidence(),
            success_score_threshold: default_success_score_threshold(),
            horizon_days: default_horizon_days(),
        }
    }
}

/// A window the generator considers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSubject {
    pub kind: EntryKind,
    pub program_id: ProgramId,
    pub window_start: NaiveDate,
    pub confidence: u8,
    pub probability: u8,
}

/// Program-level facts behind the trend and new-program alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSignal {
    pub program_id: ProgramId,
    pub trend: Trend,
    /// Earliest year with a confirmed window.
    pub first_history_year: Option<i32>,
}

/// Inputs of one generation pass.
pub struct AlertContext<'a> {
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
    pub subjects: &'a [AlertSubject],
    pub programs: &'a HashMap<ProgramId, Program>,
    pub signals: &'a [ProgramSignal],
    /// Alerts already stored, including read and dismissed ones.
    pub existing: &'a [Alert],
}

/// Preparation deadline: window start minus the program's lead time.
pub fn preparation_deadline(window_start: NaiveDate, prep_weeks: u32) -> NaiveDate {
    window_start - Duration::weeks(prep_weeks as i64)
}

/// Deadline alert generator.
#[derive(Debug, Clone, Default)]
pub struct AlertGenerator {
    config: AlertConfig,
}

impl AlertGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AlertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Produce the alerts that do not exist yet, most urgent first.
    pub fn generate(&self, ctx: &AlertContext<'_>) -> Vec<Alert> {
        let mut seen: HashSet<AlertKey> = ctx.existing.iter().map(Alert::key).collect();
        let mut alerts = Vec::new();
        let mut push = |alert: Alert| {
            if seen.insert(alert.key()) {
                alerts.push(alert);
            }
        };

        let horizon_end = ctx
            .today
            .checked_add_days(Days::new(self.config.horizon_days as u64))
            .unwrap_or(NaiveDate::MAX);
        let mut subjects: Vec<&AlertSubject> = ctx
            .subjects
            .iter()
            .filter(|s| s.window_start >= ctx.today && s.window_start <= horizon_end)
            .collect();
        subjects.sort_by(|a, b| {
            (a.window_start, &a.program_id, a.kind).cmp(&(b.window_start, &b.program_id, b.kind))
        });

        for subject in &subjects {
            let Some(program) = ctx.programs.get(&subject.program_id) else {
                tracing::debug!(program_id = %subject.program_id, "alert subject without program");
                continue;
            };
            if let Some(alert) = self.preparation_alert(subject, program, ctx) {
                push(alert);
            }
            if let Some(alert) = self.opportunity_alert(subject, program, ctx) {
                push(alert);
            }
        }

        for signal in ctx.signals {
            let Some(program) = ctx.programs.get(&signal.program_id) else {
                continue;
            };
            let mut next = subjects.iter().filter(|s| s.program_id == signal.program_id);
            let Some(next_any) = next.clone().next() else {
                continue;
            };
            // Trend alerts are keyed on the next forecast only
            if let Some(forecast) = next.find(|s| s.kind == EntryKind::Predicted) {
                if let Some(alert) = self.trend_alert(signal, forecast, program, ctx) {
                    push(alert);
                }
            }
            if let Some(alert) = self.new_program_alert(signal, next_any, program, ctx) {
                push(alert);
            }
        }

        sort_alerts(&mut alerts);
        alerts
    }

    fn preparation_alert(&self, s: &AlertSubject, program: &Program, ctx: &AlertContext<'_>) -> Option<Alert> {
        let deadline = preparation_deadline(s.window_start, program.prep_weeks);
        let days_until = (deadline - ctx.today).num_days();
        if days_until > self.config.deadline_window_days || s.confidence < self.config.min_confidence {
            return None;
        }
        let priority = if days_until <= self.config.high_priority_days {
            AlertPriority::High
        } else {
            AlertPriority::Medium
        };
        let message = if days_until >= 0 {
            format!("{}: {} day(s) left to prepare", program.name, days_until)
        } else {
            format!(
                "{}: preparation deadline passed {} day(s) ago, window opens {}",
                program.name, -days_until, s.window_start
            )
        };
        Some(new_alert(
            AlertType::PreparationDeadline,
            priority,
            s,
            deadline,
            format!("Prepare for {}", program.name),
            message,
            "Start preparing the application",
            ctx.now,
        ))
    }

    fn opportunity_alert(&self, s: &AlertSubject, program: &Program, ctx: &AlertContext<'_>) -> Option<Alert> {
        if s.kind != EntryKind::Predicted || s.confidence < self.config.high_opportunity_confidence {
            return None;
        }
        let score = program.success_rate * s.probability as f64;
        if score < self.config.success_score_threshold {
            return None;
        }
        Some(new_alert(
            AlertType::HighOpportunity,
            AlertPriority::Medium,
            s,
            preparation_deadline(s.window_start, program.prep_weeks),
            format!("{} expected to open", program.name),
            format!(
                "{} is expected to open around {} (confidence {}%)",
                program.name, s.window_start, s.confidence
            ),
            "Review the program details",
            ctx.now,
        ))
    }

    fn trend_alert(
        &self,
        signal: &ProgramSignal,
        next: &AlertSubject,
        program: &Program,
        ctx: &AlertContext<'_>,
    ) -> Option<Alert> {
        if !signal.trend.is_change() {
            return None;
        }
        let direction = if signal.trend == Trend::Increasing { "more" } else { "fewer" };
        Some(new_alert(
            AlertType::TrendChange,
            AlertPriority::Low,
            next,
            preparation_deadline(next.window_start, program.prep_weeks),
            format!("{} schedule is changing", program.name),
            format!("{} has been running {} rounds per year recently", program.name, direction),
            "Check whether the usual timing still applies",
            ctx.now,
        ))
    }

    fn new_program_alert(
        &self,
        signal: &ProgramSignal,
        next: &AlertSubject,
        program: &Program,
        ctx: &AlertContext<'_>,
    ) -> Option<Alert> {
        let first = signal.first_history_year?;
        if first < ctx.today.year() - 1 {
            return None;
        }
        Some(new_alert(
            AlertType::NewProgram,
            AlertPriority::Low,
            next,
            preparation_deadline(next.window_start, program.prep_weeks),
            format!("New program: {}", program.name),
            format!("{} started running windows in {}", program.name, first),
            "Check eligibility",
            ctx.now,
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn new_alert(
    alert_type: AlertType,
    priority: AlertPriority,
    subject: &AlertSubject,
    deadline: NaiveDate,
    title: String,
    message: String,
    action: &str,
    now: DateTime<Utc>,
) -> Alert {
    Alert {
        id: uuid::Uuid::new_v4().to_string(),
        alert_type,
        priority,
        program_id: subject.program_id.clone(),
        title,
        message,
        action: action.to_string(),
        window_start: subject.window_start,
        deadline,
        is_read: false,
        is_dismissed: false,
        created_at: now,
    }
}

/// High before medium before low, then by deadline, then by program.
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        (a.priority.rank(), a.deadline, &a.program_id, a.alert_type)
            .cmp(&(b.priority.rank(), b.deadline, &b.program_id, b.alert_type))
    });
}
