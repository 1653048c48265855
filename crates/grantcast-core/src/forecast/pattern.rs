//! Recurrence pattern mining.
//!
//! Groups a program's confirmed windows by slot and extracts, per slot, the
//! month the window usually opens in, how long it usually stays open, and the
//! most recent start date (which supplies the day-of-month template).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{ProgramId, WindowRecord, WindowStatus};

/// Recurrence summary for one (program, slot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub program_id: ProgramId,
    pub slot: u32,
    /// Mode of the observed start months (latest month wins ties).
    pub typical_month: u32,
    pub avg_duration_days: i64,
    pub last_occurrence: NaiveDate,
    pub sample_count: usize,
    /// How many samples started in `typical_month`.
    pub month_matches: usize,
}

impl Pattern {
    /// Share of samples that opened in the typical month (0.0-1.0).
    pub fn month_consistency(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.month_matches as f64 / self.sample_count as f64
    }
}

/// Pattern miner configuration and entry point.
#[derive(Debug, Clone)]
pub struct PatternMiner {
    /// Years of history to look back from the target year.
    pub lookback_years: u32,
    /// Duration used when no sample has an end date.
    pub default_duration_days: i64,
}

impl Default for PatternMiner {
    fn default() -> Self {
        Self {
            lookback_years: 3,
            default_duration_days: 30,
        }
    }
}

impl PatternMiner {
    pub fn new(lookback_years: u32, default_duration_days: i64) -> Self {
        Self {
            lookback_years: lookback_years.max(1),
            default_duration_days,
        }
    }

    /// First year of history that counts for `target_year`.
    pub fn since_year(&self, target_year: i32) -> i32 {
        target_year - self.lookback_years as i32
    }

    /// Records of `program_id` that count as history for `target_year`.
    ///
    /// Cancelled windows never opened and are not evidence of a recurrence.
    pub fn history<'a>(
        &self,
        program_id: &str,
        records: &'a [WindowRecord],
        target_year: i32,
    ) -> Vec<&'a WindowRecord> {
        let since = self.since_year(target_year);
        records
            .iter()
            .filter(|r| r.program_id == program_id)
            .filter(|r| r.year >= since && r.year < target_year)
            .filter(|r| r.status != WindowStatus::Cancelled)
            .collect()
    }

    /// Number of distinct years in the history window.
    pub fn distinct_years(&self, program_id: &str, records: &[WindowRecord], target_year: i32) -> usize {
        self.history(program_id, records, target_year)
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Mine one pattern per slot, in ascending slot order.
    pub fn mine(&self, program_id: &str, records: &[WindowRecord], target_year: i32) -> Vec<Pattern> {
        let mut by_slot: BTreeMap<u32, Vec<&WindowRecord>> = BTreeMap::new();
        for record in self.history(program_id, records, target_year) {
            by_slot.entry(record.slot).or_default().push(record);
        }

        by_slot
            .into_iter()
            .filter_map(|(slot, samples)| self.summarize(program_id, slot, &samples))
            .collect()
    }

    fn summarize(&self, program_id: &str, slot: u32, samples: &[&WindowRecord]) -> Option<Pattern> {
        let last_occurrence = samples.iter().map(|r| r.start_date).max()?;

        let mut month_counts: BTreeMap<u32, usize> = BTreeMap::new();
        for r in samples {
            *month_counts.entry(r.start_date.month()).or_default() += 1;
        }
        let (typical_month, month_matches) = month_counts
            .into_iter()
            .max_by_key(|&(month, count)| (count, month))?;

        let durations: Vec<i64> = samples.iter().filter_map(|r| r.duration_days()).collect();
        let avg_duration_days = if durations.is_empty() {
            self.default_duration_days
        } else {
            (durations.iter().sum::<i64>() as f64 / durations.len() as f64).round() as i64
        };

        Some(Pattern {
            program_id: program_id.to_string(),
            slot,
            typical_month,
            avg_duration_days,
            last_occurrence,
            sample_count: samples.len(),
            month_matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(year: i32, slot: u32, start: NaiveDate, days: Option<i64>) -> WindowRecord {
        let w = WindowRecord::new("p", year, slot, start);
        match days {
            Some(d) => w.with_end(start + chrono::Duration::days(d)),
            None => w,
        }
    }

    #[test]
    fn mines_month_duration_and_last_occurrence() {
        let records = vec![
            window(2022, 1, date(2022, 4, 20), Some(35)),
            window(2023, 1, date(2023, 4, 18), Some(34)),
            window(2024, 1, date(2024, 4, 15), Some(36)),
        ];
        let patterns = PatternMiner::default().mine("p", &records, 2025);
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.typical_month, 4);
        assert_eq!(p.avg_duration_days, 35);
        assert_eq!(p.last_occurrence, date(2024, 4, 15));
        assert_eq!(p.sample_count, 3);
        assert_eq!(p.month_matches, 3);
    }

    #[test]
    fn month_tie_goes_to_latest_month() {
        let records = vec![
            window(2023, 1, date(2023, 3, 1), None),
            window(2024, 1, date(2024, 5, 1), None),
        ];
        let p = &PatternMiner::default().mine("p", &records, 2025)[0];
        assert_eq!(p.typical_month, 5);
        assert_eq!(p.month_matches, 1);
        assert!((p.month_consistency() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn duration_defaults_without_end_dates_and_rounds() {
        let records = vec![window(2024, 1, date(2024, 6, 1), None)];
        assert_eq!(PatternMiner::default().mine("p", &records, 2025)[0].avg_duration_days, 30);

        let records = vec![
            window(2023, 1, date(2023, 6, 1), Some(30)),
            window(2024, 1, date(2024, 6, 1), Some(31)),
        ];
        // 30.5 rounds away from zero
        assert_eq!(PatternMiner::default().mine("p", &records, 2025)[0].avg_duration_days, 31);
    }

    #[test]
    fn slots_are_mined_separately_and_in_order() {
        let records = vec![
            window(2024, 2, date(2024, 9, 10), None),
            window(2024, 1, date(2024, 3, 10), None),
        ];
        let patterns = PatternMiner::default().mine("p", &records, 2025);
        assert_eq!(patterns.iter().map(|p| p.slot).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(patterns[1].typical_month, 9);
    }

    #[test]
    fn history_respects_lookback_and_excludes_target_year_and_cancelled() {
        let records = vec![
            window(2020, 1, date(2020, 4, 1), None),
            window(2022, 1, date(2022, 4, 1), None),
            window(2025, 1, date(2025, 4, 1), None),
            window(2024, 1, date(2024, 4, 1), None).with_status(WindowStatus::Cancelled),
        ];
        let miner = PatternMiner::default();
        assert_eq!(miner.history("p", &records, 2025).len(), 1);
        assert_eq!(miner.distinct_years("p", &records, 2025), 1);
    }

    #[test]
    fn no_history_no_patterns() {
        assert!(PatternMiner::default().mine("p", &[], 2025).is_empty());
    }
}
