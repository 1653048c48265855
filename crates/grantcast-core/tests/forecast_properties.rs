use chrono::{Duration, NaiveDate};
use grantcast_core::alerts::{AlertContext, AlertSubject};
use grantcast_core::{
    AlertGenerator, EngineConfig, EntryKind, ForecastEngine, MemoryStore, Program, WindowForecaster, WindowRecord,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
}

/// Up to eight windows of program "p" between 2018 and 2024.
fn history() -> impl Strategy<Value = Vec<WindowRecord>> {
    prop::collection::vec((2018i32..=2024, 1u32..=3, 1u32..=12, 1u32..=31, 0i64..=90), 0..8).prop_map(|rows| {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|(year, slot, ..)| seen.insert((*year, *slot)))
            .filter_map(|(year, slot, month, dom, len)| {
                let start = NaiveDate::from_ymd_opt(year, month, dom.min(28))?;
                Some(WindowRecord::new("p", year, slot, start).with_end(start + Duration::days(len)))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn scores_stay_in_bounds(records in history(), target in 2019i32..=2026, offset in 0i64..3000) {
        let forecaster = WindowForecaster::default();
        if let Ok(run) = forecaster.forecast("p", &records, target, day(offset)) {
            for w in &run.windows {
                prop_assert!(w.confidence <= 95);
                prop_assert!(w.probability <= 95);
                prop_assert!(w.confidence >= 40);
            }
        }
    }

    #[test]
    fn predicted_start_is_never_in_the_past(records in history(), target in 2019i32..=2026, offset in 0i64..3000) {
        let today = day(offset);
        let forecaster = WindowForecaster::default();
        if let Ok(run) = forecaster.forecast("p", &records, target, today) {
            for w in &run.windows {
                prop_assert!(w.predicted_start >= today);
                prop_assert!(w.predicted_end >= w.predicted_start);
                prop_assert!(w.predicted_announcement >= w.predicted_end);
                prop_assert!(w.year >= target);
            }
        }
    }

    #[test]
    fn forecasting_is_idempotent(records in history(), target in 2019i32..=2026, offset in 0i64..3000) {
        let today = day(offset);
        let engine = ForecastEngine::new(MemoryStore::new(), EngineConfig::default()).with_today(today);
        engine.add_program(&Program::new("p", "P")).unwrap();
        for r in &records {
            engine.add_window(r).unwrap();
        }
        let first = engine.forecast("p", target).unwrap();
        let second = engine.forecast("p", target).unwrap();
        prop_assert_eq!(&first, &second);

        let keys: HashSet<_> = first.iter().map(|w| w.key()).collect();
        prop_assert_eq!(keys.len(), first.len());
        let confirmed: HashSet<_> = records.iter().map(|r| r.key()).collect();
        prop_assert!(keys.is_disjoint(&confirmed));
    }

    #[test]
    fn alerts_are_never_regenerated(
        starts in prop::collection::vec((0i64..200, 0u8..=100, 0u8..=100, any::<bool>()), 0..12),
        prep_weeks in 1u32..16,
    ) {
        let today = day(0);
        let subjects: Vec<AlertSubject> = starts
            .iter()
            .map(|(offset, confidence, probability, confirmed)| AlertSubject {
                kind: if *confirmed { EntryKind::Confirmed } else { EntryKind::Predicted },
                program_id: "p".into(),
                window_start: today + Duration::days(*offset),
                confidence: *confidence,
                probability: *probability,
            })
            .collect();
        let mut programs = HashMap::new();
        programs.insert("p".to_string(), Program::new("p", "P").with_prep_weeks(prep_weeks).with_success_rate(0.5));
        let generator = AlertGenerator::new();

        let first = generator.generate(&AlertContext {
            today,
            now: chrono::Utc::now(),
            subjects: &subjects,
            programs: &programs,
            signals: &[],
            existing: &[],
        });
        let keys: HashSet<_> = first.iter().map(|a| a.key()).collect();
        prop_assert_eq!(keys.len(), first.len());

        let second = generator.generate(&AlertContext {
            today,
            now: chrono::Utc::now(),
            subjects: &subjects,
            programs: &programs,
            signals: &[],
            existing: &first,
        });
        prop_assert!(second.is_empty());
    }
}
