//! Trend and seasonality analysis over confirmed windows.
//!
//! Per program: how many rounds ran each year, whether that count is rising
//! or falling, and which month windows usually open in. Across programs: the
//! monthly distribution of openings and the peak months.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::model::{ForecastWindow, ProgramId, WindowRecord, WindowStatus};

/// Years of history looked at by [`analyze_program`].
pub const TREND_LOOKBACK_YEARS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    /// Increasing or decreasing.
    pub fn is_change(&self) -> bool {
        matches!(self, Trend::Increasing | Trend::Decreasing)
    }
}

/// Activity of one program in one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearStats {
    pub rounds: u32,
    pub months: Vec<u32>,
    pub total_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramTrend {
    pub program_id: ProgramId,
    pub yearly: BTreeMap<i32, YearStats>,
    pub trend: Trend,
    pub most_common_month: Option<u32>,
    pub average_rounds_per_year: f64,
    /// Earliest upcoming forecast, if any.
    pub next_prediction: Option<ForecastWindow>,
}

/// Analyze the last five years of `program_id` as seen from `current_year`.
///
/// Cancelled windows are ignored.
pub fn analyze_program(
    program_id: &str,
    records: &[WindowRecord],
    current_year: i32,
    next_prediction: Option<ForecastWindow>,
) -> ProgramTrend {
    let since = current_year - TREND_LOOKBACK_YEARS;
    let mut yearly: BTreeMap<i32, YearStats> = BTreeMap::new();
    for r in records
        .iter()
        .filter(|r| r.program_id == program_id && r.year >= since)
        .filter(|r| r.status != WindowStatus::Cancelled)
    {
        let stats = yearly.entry(r.year).or_default();
        stats.rounds += 1;
        stats.months.push(r.start_date.month());
        stats.total_days += r.duration_days().unwrap_or(0);
    }

    let rounds: Vec<f64> = yearly.values().map(|s| s.rounds as f64).collect();
    let average_rounds_per_year = if rounds.is_empty() {
        0.0
    } else {
        rounds.iter().sum::<f64>() / rounds.len() as f64
    };

    let mut month_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for month in yearly.values().flat_map(|s| s.months.iter()) {
        *month_counts.entry(*month).or_default() += 1;
    }
    let most_common_month = month_counts
        .into_iter()
        .max_by_key(|&(month, count)| (count, month))
        .map(|(month, _)| month);

    ProgramTrend {
        program_id: program_id.to_string(),
        trend: classify(&rounds),
        yearly,
        most_common_month,
        average_rounds_per_year,
        next_prediction,
    }
}

/// Compare the mean of the last two years against the mean of older years.
fn classify(rounds_per_year: &[f64]) -> Trend {
    match rounds_per_year.len() {
        0 | 1 => Trend::InsufficientData,
        2 => Trend::Stable,
        n => {
            let recent = (rounds_per_year[n - 1] + rounds_per_year[n - 2]) / 2.0;
            let older = rounds_per_year[..n - 2].iter().sum::<f64>() / (n - 2) as f64;
            if recent > older {
                Trend::Increasing
            } else if recent < older {
                Trend::Decreasing
            } else {
                Trend::Stable
            }
        }
    }
}

/// Monthly distribution of window openings across programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    /// Openings per month, 1 through 12.
    pub monthly_distribution: BTreeMap<u32, u32>,
    /// Up to three busiest months, busiest first.
    pub peak_months: Vec<u32>,
    /// Share of all openings that fall in the peak months.
    pub peak_activity_score: f64,
}

pub fn seasonal_profile(records: &[WindowRecord]) -> SeasonalProfile {
    let mut monthly_distribution: BTreeMap<u32, u32> = (1..=12).map(|m| (m, 0)).collect();
    for r in records.iter().filter(|r| r.status != WindowStatus::Cancelled) {
        *monthly_distribution.entry(r.start_date.month()).or_default() += 1;
    }

    let mut by_activity: Vec<(u32, u32)> = monthly_distribution
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(&m, &c)| (m, c))
        .collect();
    by_activity.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    by_activity.truncate(3);

    let total: u32 = monthly_distribution.values().sum();
    let peak: u32 = by_activity.iter().map(|(_, c)| c).sum();

    SeasonalProfile {
        peak_months: by_activity.into_iter().map(|(m, _)| m).collect(),
        peak_activity_score: peak as f64 / total.max(1) as f64,
        monthly_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window(program: &str, year: i32, slot: u32, month: u32) -> WindowRecord {
        let start = NaiveDate::from_ymd_opt(year, month, 10).unwrap();
        WindowRecord::new(program, year, slot, start).with_end(start + chrono::Duration::days(20))
    }

    #[test]
    fn increasing_when_recent_years_run_more_rounds() {
        let records = vec![
            window("p", 2021, 1, 4),
            window("p", 2022, 1, 4),
            window("p", 2023, 1, 4),
            window("p", 2023, 2, 9),
            window("p", 2024, 1, 4),
            window("p", 2024, 2, 9),
        ];
        let t = analyze_program("p", &records, 2025, None);
        assert_eq!(t.trend, Trend::Increasing);
        assert_eq!(t.most_common_month, Some(4));
        assert!((t.average_rounds_per_year - 1.5).abs() < 1e-9);
        assert_eq!(t.yearly[&2024].total_days, 40);
    }

    #[test]
    fn decreasing_and_stable() {
        let shrinking = vec![
            window("p", 2021, 1, 3),
            window("p", 2021, 2, 6),
            window("p", 2022, 1, 3),
            window("p", 2023, 1, 3),
        ];
        assert_eq!(analyze_program("p", &shrinking, 2025, None).trend, Trend::Decreasing);

        let flat = vec![window("p", 2022, 1, 3), window("p", 2023, 1, 3), window("p", 2024, 1, 3)];
        assert_eq!(analyze_program("p", &flat, 2025, None).trend, Trend::Stable);
    }

    #[test]
    fn short_histories() {
        assert_eq!(analyze_program("p", &[], 2025, None).trend, Trend::InsufficientData);
        let one = vec![window("p", 2024, 1, 3)];
        assert_eq!(analyze_program("p", &one, 2025, None).trend, Trend::InsufficientData);
        let two = vec![window("p", 2023, 1, 3), window("p", 2024, 1, 3), window("p", 2024, 2, 8)];
        assert_eq!(analyze_program("p", &two, 2025, None).trend, Trend::Stable);
    }

    #[test]
    fn old_years_and_other_programs_are_ignored() {
        let records = vec![window("p", 2015, 1, 3), window("q", 2024, 1, 3)];
        let t = analyze_program("p", &records, 2025, None);
        assert!(t.yearly.is_empty());
        assert_eq!(t.most_common_month, None);
    }

    #[test]
    fn seasonal_peaks_prefer_earlier_month_on_ties() {
        let records = vec![
            window("a", 2024, 1, 4),
            window("b", 2024, 1, 4),
            window("c", 2024, 1, 1),
            window("d", 2024, 1, 7),
            window("e", 2024, 1, 10),
        ];
        let profile = seasonal_profile(&records);
        assert_eq!(profile.peak_months, vec![4, 1, 7]);
        assert_eq!(profile.monthly_distribution.len(), 12);
        assert!((profile.peak_activity_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn empty_profile() {
        let profile = seasonal_profile(&[]);
        assert!(profile.peak_months.is_empty());
        assert_eq!(profile.peak_activity_score, 0.0);
    }
}
