//! # Grantcast Core Library
//!
//! This library provides the forecasting and scheduling logic behind the
//! `grantcast` CLI. It predicts when recurring grant application windows will
//! open, how confident that prediction is, and which preparation deadlines
//! need attention.
//!
//! ## Architecture
//!
//! - **Forecast**: pattern mining, confidence scoring and projection of
//!   confirmed history into predicted windows
//! - **Calendar**: month buckets and the upcoming list, with forecasts
//!   suppressed wherever a confirmed window exists
//! - **Alerts**: preparation deadline and opportunity alerts, de-duplicated
//!   across runs
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`ForecastEngine`]: pipeline entry point over any [`Store`]
//! - [`Database`]: SQLite implementation of the storage traits
//! - [`Config`]: application configuration management

pub mod alerts;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod events;
pub mod forecast;
pub mod import;
pub mod model;
pub mod priority;
pub mod repository;
pub mod storage;
pub mod trend;

pub use alerts::{AlertConfig, AlertGenerator};
pub use calendar::{Calendar, CalendarAggregator, CalendarConfig, CalendarMonth, EntryKind, UpcomingEntry};
pub use engine::{BatchReport, EngineConfig, ForecastEngine, MAX_HORIZON_DAYS};
pub use error::{ConfigError, CoreError, DatabaseError, ForecastError, ValidationError};
pub use events::PipelineEvent;
pub use forecast::{ForecastConfig, ScoringConfig, WindowForecaster};
pub use import::{ImportBatch, ImportSummary};
pub use model::{
    Alert, AlertPriority, AlertType, ForecastBasis, ForecastWindow, Program, ProgramId, UserProfile, WindowKey,
    WindowRecord, WindowStatus,
};
pub use priority::{PriorityScorer, PriorityWeights, RankedProgram};
pub use repository::{MemoryStore, Store};
pub use storage::{Config, Database};
pub use trend::{ProgramTrend, SeasonalProfile, Trend};
