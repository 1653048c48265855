use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ProgramId, WindowKey};

/// Every notable step of the forecasting pipeline produces an event.
/// Batch runs return them to the caller; `emit` forwards them to tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    ForecastComputed {
        program_id: ProgramId,
        target_year: i32,
        windows: usize,
        at: DateTime<Utc>,
    },
    /// Program history too thin to project from.
    InsufficientHistory {
        program_id: ProgramId,
        years: usize,
        required: usize,
    },
    /// A projected day did not exist in its month and was clamped.
    DateClamped {
        key: WindowKey,
        requested_day: u32,
        clamped_to: NaiveDate,
    },
    /// Projection rolled into a later year because the date had passed.
    RolledForward {
        key: WindowKey,
        from_year: i32,
    },
    /// Forecast dropped because a confirmed window holds the key.
    ForecastSuppressed {
        key: WindowKey,
    },
    CacheHit {
        program_id: ProgramId,
        target_year: i32,
    },
    CacheStale {
        program_id: ProgramId,
        target_year: i32,
        reason: String,
    },
    /// A program failed and was left out of a best-effort response.
    ProgramSkipped {
        program_id: ProgramId,
        error: String,
    },
    AlertsGenerated {
        created: usize,
        at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Forward the event to the tracing subscriber.
    pub fn emit(&self) {
        match self {
            PipelineEvent::ForecastComputed {
                program_id,
                target_year,
                windows,
                ..
            } => tracing::debug!(program_id = %program_id, target_year, windows, "forecast computed"),
            PipelineEvent::InsufficientHistory {
                program_id,
                years,
                required,
            } => tracing::debug!(program_id = %program_id, years, required, "insufficient history"),
            PipelineEvent::DateClamped {
                key,
                requested_day,
                clamped_to,
            } => tracing::debug!(key = %key, requested_day, clamped_to = %clamped_to, "projected day clamped"),
            PipelineEvent::RolledForward { key, from_year } => {
                tracing::debug!(key = %key, from_year, "projection rolled forward")
            }
            PipelineEvent::ForecastSuppressed { key } => {
                tracing::debug!(key = %key, "forecast suppressed by confirmed window")
            }
            PipelineEvent::CacheHit {
                program_id,
                target_year,
            } => tracing::trace!(program_id = %program_id, target_year, "forecast cache hit"),
            PipelineEvent::CacheStale {
                program_id,
                target_year,
                reason,
            } => tracing::info!(program_id = %program_id, target_year, reason = %reason, "stale forecast cache"),
            PipelineEvent::ProgramSkipped { program_id, error } => {
                tracing::warn!(program_id = %program_id, error = %error, "program skipped")
            }
            PipelineEvent::AlertsGenerated { created, .. } => {
                tracing::info!(created, "alerts generated")
            }
        }
    }
}
