//! Core error types for grantcast-core.
//!
//! Errors are layered with thiserror: storage, configuration and validation
//! failures each have their own enum and fold into [`CoreError`].

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{WindowKey, WindowStatus};

/// Core error type for grantcast-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Forecasting errors
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid date range
    #[error("Invalid date range: end ({end}) must not be before start ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Status change not allowed by the window lifecycle
    #[error("Illegal status transition for {key}: {from} -> {to}")]
    IllegalTransition {
        key: WindowKey,
        from: WindowStatus,
        to: WindowStatus,
    },

    /// A confirmed window already holds the key
    #[error("Window {0} is already recorded")]
    DuplicateWindow(WindowKey),

    /// No confirmed window exists for the key
    #[error("No window recorded for {0}")]
    UnknownWindow(WindowKey),

    /// No alert exists with the id
    #[error("No alert with id {0}")]
    UnknownAlert(String),
}

/// Forecasting errors.
///
/// Only [`ForecastError::UnknownProgram`] escapes the engine; the other
/// variants are recovered where they arise and surface as log events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    /// The program id is not in the registry
    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    /// Not enough history to project a window
    #[error("Insufficient history for program {program_id}: {years} distinct year(s), need {required}")]
    InsufficientData {
        program_id: String,
        years: usize,
        required: usize,
    },

    /// A projected day does not exist in the target month
    #[error("Invalid date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl CoreError {
    /// True when the error means the program id does not exist.
    pub fn is_unknown_program(&self) -> bool {
        matches!(self, CoreError::Forecast(ForecastError::UnknownProgram(_)))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
