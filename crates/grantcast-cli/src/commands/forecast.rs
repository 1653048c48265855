//! Forecast commands for CLI.

use chrono::{Datelike, NaiveDate};
use clap::Args;

use super::{open_engine, print_json};

#[derive(Args)]
pub struct ForecastArgs {
    /// Program id
    pub program: String,
    /// Target year (defaults to the current year)
    pub year: Option<i32>,
    /// Include pipeline events in the output
    #[arg(long)]
    pub events: bool,
}

pub fn run(args: ForecastArgs, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;
    let year = args.year.unwrap_or_else(|| engine.today().year());

    let run = engine.forecast_run(&args.program, year)?;
    run.events.iter().for_each(|e| e.emit());
    if args.events {
        print_json(&serde_json::json!({
            "forecasts": run.windows,
            "events": run.events,
        }))
    } else {
        print_json(&run.windows)
    }
}

pub fn recompute(year: Option<i32>, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;
    let year = year.unwrap_or_else(|| engine.today().year());
    let report = engine.recompute_all(year)?;
    print_json(&report)
}
