pub mod alerts;
pub mod calendar;
pub mod completions;
pub mod config;
pub mod forecast;
pub mod import;
pub mod program;
pub mod trend;
pub mod window;

use chrono::NaiveDate;
use grantcast_core::{Config, Database, ForecastEngine};

/// Open the on-disk store with the user's configuration.
pub fn open_engine(today: Option<NaiveDate>) -> Result<ForecastEngine<Database>, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = ForecastEngine::new(Database::open()?, config.engine_config());
    Ok(match today {
        Some(today) => engine.with_today(today),
        None => engine,
    })
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
