//! Forecasting pipeline.
//!
//! This module provides:
//! - Pattern mining of historical windows per (program, slot)
//! - Confidence and probability scoring of mined patterns
//! - Forward projection of patterns into forecast windows

mod confidence;
mod pattern;
mod projector;

pub use confidence::{ConfidenceScorer, PatternScore, ScoringConfig};
pub use pattern::{Pattern, PatternMiner};
pub use projector::{clamp_to_month, ForecastConfig, ForecastRun, WindowForecaster};
