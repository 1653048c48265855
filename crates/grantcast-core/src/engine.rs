//! Forecasting engine: the pipeline behind every query.
//!
//! Confirmed history -> pattern mining -> confidence scoring -> projection,
//! with the result cached per (program, target year). Calendar, upcoming and
//! alert queries are built from cached forecasts plus confirmed windows.
//!
//! Multi-program queries are best effort: a program that fails is left out,
//! logged, and reported as a [`PipelineEvent::ProgramSkipped`].

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Days, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::alerts::{sort_alerts, AlertConfig, AlertContext, AlertGenerator, AlertSubject, ProgramSignal};
use crate::calendar::{
    suppress_confirmed, upcoming, Calendar, CalendarAggregator, CalendarConfig, CalendarInput, EntryKind,
    UpcomingEntry,
};
use crate::error::{ForecastError, Result, ValidationError};
use crate::events::PipelineEvent;
use crate::forecast::{clamp_to_month, ForecastConfig, ForecastRun, ScoringConfig, WindowForecaster};
use crate::import::{ImportBatch, ImportSummary};
use crate::model::{
    Alert, ForecastWindow, Program, ProgramId, UserProfile, WindowKey, WindowRecord, WindowStatus,
};
use crate::priority::{PriorityScorer, PriorityWeights, RankedProgram};
use crate::repository::{CachedForecast, Store};
use crate::trend::{analyze_program, seasonal_profile, ProgramTrend, SeasonalProfile};

/// Longest horizon or calendar span a query accepts, about ten years.
pub const MAX_HORIZON_DAYS: u32 = 3660;

/// Every tunable of the engine, one section per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub priority: PriorityWeights,
}

/// Result of [`ForecastEngine::recompute_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub target_year: i32,
    pub programs: usize,
    pub forecasts: usize,
    pub skipped: Vec<ProgramId>,
    pub events: Vec<PipelineEvent>,
}

pub struct ForecastEngine<S> {
    store: S,
    forecaster: WindowForecaster,
    alerts: AlertGenerator,
    calendar: CalendarAggregator,
    priority: PriorityScorer,
    today: Option<NaiveDate>,
}

impl<S: Store> ForecastEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            forecaster: WindowForecaster::new(config.forecast, config.scoring),
            alerts: AlertGenerator::with_config(config.alerts),
            calendar: CalendarAggregator::with_config(config.calendar),
            priority: PriorityScorer::with_weights(config.priority),
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // === Registry and history ===

    pub fn add_program(&self, program: &Program) -> Result<()> {
        program.validate()?;
        self.store.save_program(program)?;
        tracing::debug!(program_id = %program.id, "program saved");
        Ok(())
    }

    pub fn programs(&self) -> Result<Vec<Program>> {
        self.store.list_programs()
    }

    /// Record a confirmed window. Returns false when the key already exists.
    ///
    /// # Errors
    /// Unknown program or an invalid record.
    pub fn add_window(&self, record: &WindowRecord) -> Result<bool> {
        record.validate()?;
        self.store.get_program(&record.program_id)?;
        let inserted = self.store.insert_window(record)?;
        if !inserted {
            tracing::debug!(key = %record.key(), "window already recorded");
        }
        Ok(inserted)
    }

    pub fn windows(&self, program_id: Option<&str>) -> Result<Vec<WindowRecord>> {
        match program_id {
            Some(id) => {
                self.store.get_program(id)?;
                self.store.list_windows(id)
            }
            None => self.store.all_windows(),
        }
    }

    /// Apply a manual status change.
    ///
    /// # Errors
    /// Unknown window or a move the lifecycle does not allow.
    pub fn update_status(&self, key: &WindowKey, status: WindowStatus) -> Result<WindowRecord> {
        let mut record = self
            .store
            .get_window(key)?
            .ok_or_else(|| ValidationError::UnknownWindow(key.clone()))?;
        record.transition(status)?;
        self.store.set_status(key, status)?;
        tracing::info!(key = %key, status = %status, "window status changed");
        Ok(self.store.get_window(key)?.unwrap_or(record))
    }

    /// Move every window along its date-driven lifecycle as of today.
    pub fn advance_statuses(&self) -> Result<Vec<WindowRecord>> {
        let today = self.today();
        let mut changed = Vec::new();
        for mut record in self.store.all_windows()? {
            if record.advance(today) {
                self.store.set_status(&record.key(), record.status)?;
                changed.push(record);
            }
        }
        tracing::debug!(changed = changed.len(), "statuses advanced");
        Ok(changed)
    }

    /// Load a batch of programs and windows. Bad entries are rejected
    /// individually; the rest of the batch still lands. A window whose key is
    /// already stored replaces the stored record when its content differs.
    pub fn ingest(&self, batch: &ImportBatch) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for program in &batch.programs {
            match program.validate() {
                Ok(()) => {
                    self.store.save_program(program)?;
                    summary.programs_saved += 1;
                }
                Err(e) => summary.rejected.push(format!("program {}: {e}", program.id)),
            }
        }
        for record in &batch.windows {
            if let Err(e) = record.validate() {
                summary.rejected.push(format!("window {}: {e}", record.key()));
                continue;
            }
            if let Err(e) = self.store.get_program(&record.program_id) {
                summary.rejected.push(format!("window {}: {e}", record.key()));
                continue;
            }
            match self.store.get_window(&record.key())? {
                None => {
                    self.store.insert_window(record)?;
                    summary.windows_inserted += 1;
                }
                Some(stored) if stored.same_content(record) => summary.windows_skipped += 1,
                Some(_) => {
                    self.store.replace_window(record)?;
                    tracing::debug!(key = %record.key(), "window updated from import");
                    summary.windows_updated += 1;
                }
            }
        }
        tracing::info!(
            programs = summary.programs_saved,
            inserted = summary.windows_inserted,
            updated = summary.windows_updated,
            skipped = summary.windows_skipped,
            rejected = summary.rejected.len(),
            "import finished"
        );
        Ok(summary)
    }

    // === Forecasting ===

    /// Forecasts of one program for `target_year`, minus any key that has a
    /// confirmed window. Thin history yields an empty list.
    ///
    /// # Errors
    /// [`ForecastError::UnknownProgram`] for an unregistered id.
    pub fn forecast(&self, program_id: &str, target_year: i32) -> Result<Vec<ForecastWindow>> {
        let run = self.forecast_run(program_id, target_year)?;
        run.events.iter().for_each(PipelineEvent::emit);
        Ok(run.windows)
    }

    /// Like [`Self::forecast`], returning the pipeline events as well.
    pub fn forecast_run(&self, program_id: &str, target_year: i32) -> Result<ForecastRun> {
        self.store.get_program(program_id)?;
        let today = self.today();
        let since_year = target_year - self.forecaster.config().lookback_years as i32;
        let records = self.store.list_windows_since(program_id, since_year)?;
        let watermark = self.store.history_watermark(program_id)?;
        let mut events = Vec::new();

        let windows = match self.cached(program_id, target_year, today, &mut events)? {
            Some(cached) => cached.forecasts,
            None => {
                let windows = self.compute(program_id, &records, target_year, today, &mut events)?;
                self.store.save_forecast(&CachedForecast {
                    program_id: program_id.to_string(),
                    target_year,
                    model_version: self.forecaster.config().model_version.clone(),
                    watermark,
                    computed_at: Utc::now(),
                    forecasts: windows.clone(),
                })?;
                windows
            }
        };

        let confirmed: HashSet<WindowKey> = records.iter().map(WindowRecord::key).collect();
        let windows: Vec<ForecastWindow> = windows
            .into_iter()
            .filter(|w| {
                let key = w.key();
                let suppressed = confirmed.contains(&key);
                if suppressed {
                    events.push(PipelineEvent::ForecastSuppressed { key });
                }
                !suppressed
            })
            .collect();
        Ok(ForecastRun { windows, events })
    }

    /// Recompute every program for `target_year`, ignoring the cache.
    ///
    /// Programs are projected in parallel; results are stored sequentially.
    pub fn recompute_all(&self, target_year: i32) -> Result<BatchReport> {
        let programs = self.store.list_programs()?;
        let history = self.store.all_windows()?;
        let today = self.today();

        let results: Vec<(ProgramId, std::result::Result<ForecastRun, ForecastError>)> = programs
            .par_iter()
            .map(|p| (p.id.clone(), self.forecaster.forecast(&p.id, &history, target_year, today)))
            .collect();

        let mut report = BatchReport {
            target_year,
            programs: programs.len(),
            ..Default::default()
        };
        for (program_id, result) in results {
            let windows = match result {
                Ok(run) => {
                    report.events.extend(run.events);
                    run.windows
                }
                Err(ForecastError::InsufficientData { years, required, .. }) => {
                    report.events.push(PipelineEvent::InsufficientHistory {
                        program_id: program_id.clone(),
                        years,
                        required,
                    });
                    Vec::new()
                }
                Err(e) => {
                    report.events.push(PipelineEvent::ProgramSkipped {
                        program_id: program_id.clone(),
                        error: e.to_string(),
                    });
                    report.skipped.push(program_id);
                    continue;
                }
            };
            report.forecasts += windows.len();
            report.events.push(PipelineEvent::ForecastComputed {
                program_id: program_id.clone(),
                target_year,
                windows: windows.len(),
                at: Utc::now(),
            });
            self.store.save_forecast(&CachedForecast {
                watermark: self.store.history_watermark(&program_id)?,
                program_id,
                target_year,
                model_version: self.forecaster.config().model_version.clone(),
                computed_at: Utc::now(),
                forecasts: windows,
            })?;
        }
        report.events.iter().for_each(PipelineEvent::emit);
        Ok(report)
    }

    fn compute(
        &self,
        program_id: &str,
        records: &[WindowRecord],
        target_year: i32,
        today: NaiveDate,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<Vec<ForecastWindow>> {
        let windows = match self.forecaster.forecast(program_id, records, target_year, today) {
            Ok(run) => {
                events.extend(run.events);
                run.windows
            }
            Err(ForecastError::InsufficientData { years, required, .. }) => {
                events.push(PipelineEvent::InsufficientHistory {
                    program_id: program_id.to_string(),
                    years,
                    required,
                });
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        events.push(PipelineEvent::ForecastComputed {
            program_id: program_id.to_string(),
            target_year,
            windows: windows.len(),
            at: Utc::now(),
        });
        Ok(windows)
    }

    /// A cached entry that is still valid for `today`.
    fn cached(
        &self,
        program_id: &str,
        target_year: i32,
        today: NaiveDate,
        events: &mut Vec<PipelineEvent>,
    ) -> Result<Option<CachedForecast>> {
        let Some(cached) = self.store.find_forecast(program_id, target_year)? else {
            return Ok(None);
        };
        let watermark = self.store.history_watermark(program_id)?;
        let reason = if cached.model_version != self.forecaster.config().model_version {
            Some("model version changed")
        } else if watermark > cached.watermark {
            Some("history changed")
        } else if cached.forecasts.iter().any(|f| f.predicted_start < today) {
            Some("predicted start has passed")
        } else if cached.forecasts.iter().any(|f| rolled_past_today(f, target_year, today)) {
            Some("computed for a later date")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                events.push(PipelineEvent::CacheStale {
                    program_id: program_id.to_string(),
                    target_year,
                    reason: reason.to_string(),
                });
                Ok(None)
            }
            None => {
                events.push(PipelineEvent::CacheHit {
                    program_id: program_id.to_string(),
                    target_year,
                });
                Ok(Some(cached))
            }
        }
    }

    /// Forecasts of every program for every year in `years`, best effort.
    fn forecasts_for_years(&self, programs: &[Program], years: std::ops::RangeInclusive<i32>) -> Vec<ForecastWindow> {
        let mut windows = Vec::new();
        for program in programs {
            for year in years.clone() {
                match self.forecast_run(&program.id, year) {
                    Ok(run) => {
                        run.events.iter().for_each(PipelineEvent::emit);
                        windows.extend(run.windows);
                    }
                    Err(e) => {
                        PipelineEvent::ProgramSkipped {
                            program_id: program.id.clone(),
                            error: e.to_string(),
                        }
                        .emit();
                        break;
                    }
                }
            }
        }
        windows
    }

    // === Queries ===

    /// Month buckets of confirmed and predicted windows starting in `[from, to]`.
    pub fn calendar(&self, from: NaiveDate, to: NaiveDate) -> Result<Calendar> {
        if to < from {
            return Err(ValidationError::InvalidDateRange { start: from, end: to }.into());
        }
        if (to - from).num_days() > MAX_HORIZON_DAYS as i64 {
            return Err(ValidationError::InvalidValue {
                field: "range".into(),
                message: format!("{from}..{to} spans more than {MAX_HORIZON_DAYS} days"),
            }
            .into());
        }
        let programs = self.store.list_programs()?;
        let forecasts = self.forecasts_for_years(&programs, from.year()..=to.year());
        let confirmed = self.store.list_windows_between(from, to)?;
        let confirmed_keys = self.confirmed_keys()?;
        let priorities: HashMap<ProgramId, f64> =
            programs.iter().map(|p| (p.id.clone(), self.priority.score(p))).collect();
        let programs: HashMap<ProgramId, Program> = programs.into_iter().map(|p| (p.id.clone(), p)).collect();

        Ok(self.calendar.aggregate(&CalendarInput {
            from,
            to,
            today: self.today(),
            confirmed: &confirmed,
            forecasts: &forecasts,
            confirmed_keys: &confirmed_keys,
            programs: &programs,
            priorities: &priorities,
        })?)
    }

    /// Windows opening within `horizon_days` of today.
    pub fn upcoming(&self, horizon_days: u32) -> Result<Vec<UpcomingEntry>> {
        let today = self.today();
        let until = horizon_end(today, horizon_days)?;
        let programs = self.store.list_programs()?;
        let forecasts = self.forecasts_for_years(&programs, today.year()..=until.year());
        let confirmed = self.store.list_windows_between(today, until)?;
        let confirmed_keys = self.confirmed_keys()?;
        Ok(upcoming(
            today,
            horizon_days,
            &confirmed,
            &forecasts,
            &confirmed_keys,
            self.calendar.config().upcoming_min_confidence,
        ))
    }

    /// Generate and store the alerts due today. Returns only the new ones.
    pub fn refresh_alerts(&self) -> Result<Vec<Alert>> {
        let today = self.today();
        let until = horizon_end(today, self.alerts.config().horizon_days)?;
        let programs = self.store.list_programs()?;
        let forecasts = self.forecasts_for_years(&programs, today.year()..=until.year());
        let confirmed_keys = self.confirmed_keys()?;

        let mut subjects: Vec<AlertSubject> = self
            .store
            .list_windows_between(today, until)?
            .into_iter()
            .filter(|r| r.status != WindowStatus::Cancelled)
            .map(|r| AlertSubject {
                kind: EntryKind::Confirmed,
                program_id: r.program_id,
                window_start: r.start_date,
                confidence: 100,
                probability: 100,
            })
            .collect();
        subjects.extend(suppress_confirmed(&forecasts, &confirmed_keys).into_iter().map(|f| {
            AlertSubject {
                kind: EntryKind::Predicted,
                program_id: f.program_id.clone(),
                window_start: f.predicted_start,
                confidence: f.confidence,
                probability: f.probability,
            }
        }));

        let mut signals = Vec::with_capacity(programs.len());
        for program in &programs {
            let history = self.store.list_windows(&program.id)?;
            let trend = analyze_program(&program.id, &history, today.year(), None);
            let first_history_year = history
                .iter()
                .filter(|r| r.status != WindowStatus::Cancelled)
                .map(|r| r.year)
                .min();
            signals.push(ProgramSignal {
                program_id: program.id.clone(),
                trend: trend.trend,
                first_history_year,
            });
        }

        let programs: HashMap<ProgramId, Program> = programs.into_iter().map(|p| (p.id.clone(), p)).collect();
        let existing = self.store.list_alerts()?;
        let generated = self.alerts.generate(&AlertContext {
            today,
            now: Utc::now(),
            subjects: &subjects,
            programs: &programs,
            signals: &signals,
            existing: &existing,
        });
        let created = self.store.save_alerts(&generated)?;
        PipelineEvent::AlertsGenerated { created, at: Utc::now() }.emit();
        Ok(generated)
    }

    /// Stored alerts, most urgent first. Dismissed alerts are hidden unless
    /// the profile asks for them.
    pub fn alerts(&self, profile: Option<&UserProfile>) -> Result<Vec<Alert>> {
        let default_profile = UserProfile::default();
        let profile = profile.unwrap_or(&default_profile);
        let programs: HashMap<ProgramId, Program> = self
            .store
            .list_programs()?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let mut alerts: Vec<Alert> = self
            .store
            .list_alerts()?
            .into_iter()
            .filter(|a| profile.matches(a, programs.get(&a.program_id)))
            .collect();
        sort_alerts(&mut alerts);
        Ok(alerts)
    }

    pub fn mark_alert_read(&self, id: &str) -> Result<()> {
        self.store.mark_read(id)
    }

    pub fn dismiss_alert(&self, id: &str) -> Result<()> {
        self.store.dismiss(id)
    }

    /// Year-by-year activity of a program, with its next predicted window.
    pub fn trend(&self, program_id: &str) -> Result<ProgramTrend> {
        self.store.get_program(program_id)?;
        let today = self.today();
        let history = self.store.list_windows(program_id)?;
        let mut next: Vec<ForecastWindow> = Vec::new();
        for year in today.year()..=today.year() + 1 {
            next.extend(self.forecast(program_id, year)?);
        }
        let next_prediction = next
            .into_iter()
            .filter(|f| f.predicted_start >= today)
            .min_by_key(|f| (f.predicted_start, f.slot));
        Ok(analyze_program(program_id, &history, today.year(), next_prediction))
    }

    pub fn seasonal(&self) -> Result<SeasonalProfile> {
        Ok(seasonal_profile(&self.store.all_windows()?))
    }

    pub fn rank_programs(&self) -> Result<Vec<RankedProgram>> {
        Ok(self.priority.rank(&self.store.list_programs()?))
    }

    fn confirmed_keys(&self) -> Result<HashSet<WindowKey>> {
        Ok(self.store.all_windows()?.iter().map(WindowRecord::key).collect())
    }
}

/// `today + days`, refusing horizons beyond [`MAX_HORIZON_DAYS`].
fn horizon_end(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: "horizon_days".into(),
        message,
    };
    if days > MAX_HORIZON_DAYS {
        return Err(invalid(format!("{days} exceeds the maximum of {MAX_HORIZON_DAYS}")).into());
    }
    today
        .checked_add_days(Days::new(days as u64))
        .ok_or_else(|| invalid(format!("{today} + {days} day(s) is out of range")).into())
}

/// True when a forecast was rolled into a later year than `today` calls for.
fn rolled_past_today(forecast: &ForecastWindow, target_year: i32, today: NaiveDate) -> bool {
    if forecast.year <= target_year {
        return false;
    }
    let month = forecast.predicted_start.month();
    let day = forecast.last_occurrence.day();
    clamp_to_month(forecast.year - 1, month, day).map_or(true, |start| start >= today)
}
