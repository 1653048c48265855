//! Forward projection of mined patterns into forecast windows.
//!
//! The forecaster is pure: history and "today" go in, forecasts come out.
//! Suppression against confirmed windows is the caller's job.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ConfidenceScorer, Pattern, PatternMiner, ScoringConfig};
use crate::error::ForecastError;
use crate::events::PipelineEvent;
use crate::model::{ForecastBasis, ForecastWindow, WindowKey, WindowRecord};

/// Forecasting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Years of history mined for a target year.
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,
    /// Distinct history years required before anything is projected.
    #[serde(default = "default_min_history_years")]
    pub min_history_years: u32,
    /// Days between the predicted end and the result announcement.
    #[serde(default = "default_result_lag_days")]
    pub result_lag_days: i64,
    #[serde(default = "default_duration_days")]
    pub default_duration_days: i64,
    /// Marker stored with cached forecasts; a change invalidates the cache.
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

fn default_lookback_years() -> u32 {
    3
}
fn default_min_history_years() -> u32 {
    1
}
fn default_result_lag_days() -> i64 {
    75
}
fn default_duration_days() -> i64 {
    30
}
fn default_model_version() -> String {
    "historical-v1".into()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_years: default_lookback_years(),
            min_history_years: default_min_history_years(),
            result_lag_days: default_result_lag_days(),
            default_duration_days: default_duration_days(),
            model_version: default_model_version(),
        }
    }
}

/// Output of one forecasting run for a program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastRun {
    pub windows: Vec<ForecastWindow>,
    pub events: Vec<PipelineEvent>,
}

/// Window forecaster: mine, score, project.
#[derive(Debug, Clone)]
pub struct WindowForecaster {
    config: ForecastConfig,
    miner: PatternMiner,
    scorer: ConfidenceScorer,
}

impl Default for WindowForecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default(), ScoringConfig::default())
    }
}

impl WindowForecaster {
    pub fn new(config: ForecastConfig, scoring: ScoringConfig) -> Self {
        let miner = PatternMiner::new(config.lookback_years, config.default_duration_days);
        Self {
            config,
            miner,
            scorer: ConfidenceScorer::with_config(scoring),
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn miner(&self) -> &PatternMiner {
        &self.miner
    }

    /// Forecast every slot of `program_id` for `target_year`.
    ///
    /// # Errors
    /// Returns [`ForecastError::InsufficientData`] when the history spans fewer
    /// distinct years than `min_history_years`.
    pub fn forecast(
        &self,
        program_id: &str,
        records: &[WindowRecord],
        target_year: i32,
        today: NaiveDate,
    ) -> Result<ForecastRun, ForecastError> {
        let years = self.miner.distinct_years(program_id, records, target_year);
        let required = self.config.min_history_years.max(1) as usize;
        if years < required {
            return Err(ForecastError::InsufficientData {
                program_id: program_id.to_string(),
                years,
                required,
            });
        }

        let mut run = ForecastRun::default();
        for pattern in self.miner.mine(program_id, records, target_year) {
            let window = self.project(&pattern, target_year, today, &mut run.events)?;
            run.windows.push(window);
        }
        Ok(run)
    }

    /// Project a single pattern, rolling forward until the start is not in the past.
    pub fn project(
        &self,
        pattern: &Pattern,
        target_year: i32,
        today: NaiveDate,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<ForecastWindow, ForecastError> {
        let day = pattern.last_occurrence.day();
        let mut year = target_year;
        let mut start = clamp_to_month(year, pattern.typical_month, day)?;
        while start < today {
            events.push(PipelineEvent::RolledForward {
                key: WindowKey::new(pattern.program_id.clone(), year, pattern.slot),
                from_year: year,
            });
            year += 1;
            start = clamp_to_month(year, pattern.typical_month, day)?;
        }
        if start.day() != day {
            events.push(PipelineEvent::DateClamped {
                key: WindowKey::new(pattern.program_id.clone(), year, pattern.slot),
                requested_day: day,
                clamped_to: start,
            });
        }

        let invalid = || ForecastError::InvalidDate {
            year,
            month: pattern.typical_month,
            day,
        };
        let end = Duration::try_days(pattern.avg_duration_days.max(0))
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(invalid)?;
        let announcement = Duration::try_days(self.config.result_lag_days)
            .and_then(|d| end.checked_add_signed(d))
            .ok_or_else(invalid)?;
        let score = self.scorer.score(pattern);

        Ok(ForecastWindow {
            program_id: pattern.program_id.clone(),
            year,
            slot: pattern.slot,
            predicted_start: start,
            predicted_end: end,
            predicted_announcement: announcement,
            confidence: score.confidence,
            probability: score.probability,
            basis: ForecastBasis::Historical,
            notes: notes_for(pattern),
            sample_count: pattern.sample_count as u32,
            last_occurrence: pattern.last_occurrence,
        })
    }
}

fn notes_for(pattern: &Pattern) -> String {
    let mut notes = format!(
        "Based on {} past window(s) in slot {}",
        pattern.sample_count, pattern.slot
    );
    if pattern.sample_count == 1 {
        notes.push_str("; single observation, dates are a rough guess");
    } else if pattern.month_matches < pattern.sample_count {
        notes.push_str("; opening month varied between years");
    }
    notes
}

/// `date(year, month, day)`, with the day clamped to the month's last day.
pub fn clamp_to_month(year: i32, month: u32, day: u32) -> Result<NaiveDate, ForecastError> {
    let invalid = || ForecastError::InvalidDate { year, month, day };
    let last = last_day_of_month(year, month).ok_or_else(invalid)?;
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last)).ok_or_else(invalid)
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt().map(|d| d.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn history() -> Vec<WindowRecord> {
        vec![
            WindowRecord::new("p", 2022, 1, date(2022, 4, 20)).with_end(date(2022, 5, 25)),
            WindowRecord::new("p", 2023, 1, date(2023, 4, 18)).with_end(date(2023, 5, 23)),
            WindowRecord::new("p", 2024, 1, date(2024, 4, 15)).with_end(date(2024, 5, 20)),
        ]
    }

    #[test]
    fn projects_dates_from_pattern() {
        let run = WindowForecaster::default()
            .forecast("p", &history(), 2025, date(2025, 1, 10))
            .unwrap();
        assert_eq!(run.windows.len(), 1);
        let w = &run.windows[0];
        assert_eq!(w.year, 2025);
        assert_eq!(w.predicted_start, date(2025, 4, 15));
        assert_eq!(w.predicted_end, date(2025, 5, 20));
        assert_eq!(w.predicted_announcement, date(2025, 8, 3));
        assert_eq!(w.basis, ForecastBasis::Historical);
        assert!(w.confidence >= 75);
        assert!(run.events.is_empty());
    }

    #[test]
    fn rolls_forward_when_start_already_passed() {
        let run = WindowForecaster::default()
            .forecast("p", &history(), 2025, date(2025, 6, 1))
            .unwrap();
        let w = &run.windows[0];
        assert_eq!(w.year, 2026);
        assert_eq!(w.predicted_start, date(2026, 4, 15));
        assert!(matches!(run.events[0], PipelineEvent::RolledForward { from_year: 2025, .. }));
    }

    #[test]
    fn rolls_over_several_years_for_old_targets() {
        let run = WindowForecaster::default()
            .forecast("p", &history(), 2025, date(2027, 5, 1))
            .unwrap();
        assert_eq!(run.windows[0].predicted_start, date(2028, 4, 15));
    }

    #[test]
    fn start_on_today_is_not_rolled() {
        let run = WindowForecaster::default()
            .forecast("p", &history(), 2025, date(2025, 4, 15))
            .unwrap();
        assert_eq!(run.windows[0].predicted_start, date(2025, 4, 15));
    }

    #[test]
    fn clamps_day_to_end_of_month() {
        assert_eq!(clamp_to_month(2025, 2, 30).unwrap(), date(2025, 2, 28));
        assert_eq!(clamp_to_month(2024, 2, 30).unwrap(), date(2024, 2, 29));
        assert_eq!(clamp_to_month(2025, 4, 31).unwrap(), date(2025, 4, 30));
        assert_eq!(clamp_to_month(2025, 12, 31).unwrap(), date(2025, 12, 31));
        assert!(clamp_to_month(2025, 13, 1).is_err());
    }

    #[test]
    fn leap_day_template_is_clamped_and_reported() {
        let records = vec![
            WindowRecord::new("p", 2024, 1, date(2024, 2, 29)),
            WindowRecord::new("p", 2023, 1, date(2023, 2, 28)),
        ];
        let run = WindowForecaster::default()
            .forecast("p", &records, 2025, date(2025, 1, 1))
            .unwrap();
        assert_eq!(run.windows[0].predicted_start, date(2025, 2, 28));
        assert!(run
            .events
            .iter()
            .any(|e| matches!(e, PipelineEvent::DateClamped { requested_day: 29, .. })));
    }

    #[test]
    fn insufficient_history_is_an_explicit_error() {
        let err = WindowForecaster::default()
            .forecast("p", &[], 2025, date(2025, 1, 1))
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                program_id: "p".into(),
                years: 0,
                required: 1
            }
        );
    }

    #[test]
    fn strict_mode_requires_two_distinct_years() {
        let forecaster = WindowForecaster::new(
            ForecastConfig {
                min_history_years: 2,
                ..Default::default()
            },
            ScoringConfig::default(),
        );
        let single = vec![WindowRecord::new("p", 2024, 1, date(2024, 4, 15))];
        assert!(forecaster.forecast("p", &single, 2025, date(2025, 1, 1)).is_err());
        assert!(forecaster.forecast("p", &history(), 2025, date(2025, 1, 1)).is_ok());
    }

    #[test]
    fn sample_count_is_per_slot() {
        let mut records = history();
        records.push(WindowRecord::new("p", 2024, 2, date(2024, 9, 10)));
        let run = WindowForecaster::default()
            .forecast("p", &records, 2025, date(2025, 1, 1))
            .unwrap();
        let counts: Vec<(u32, u32)> = run.windows.iter().map(|w| (w.slot, w.sample_count)).collect();
        assert_eq!(counts, vec![(1, 3), (2, 1)]);
    }

    #[test]
    fn notes_mention_sample_count() {
        let run = WindowForecaster::default()
            .forecast("p", &history(), 2025, date(2025, 1, 1))
            .unwrap();
        assert!(run.windows[0].notes.starts_with("Based on 3 past window(s)"));
    }
}
