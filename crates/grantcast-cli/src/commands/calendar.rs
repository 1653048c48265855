//! Calendar and upcoming commands for CLI.

use chrono::{Datelike, NaiveDate};
use clap::Args;
use grantcast_core::Config;

use super::{open_engine, parse_date, print_json};

#[derive(Args)]
pub struct CalendarArgs {
    /// First day (YYYY-MM-DD); defaults to January 1 of the current year
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD); defaults to December 31 of the `from` year
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
}

pub fn run(args: CalendarArgs, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;
    let year = engine.today().year();
    let from = match args.from {
        Some(from) => from,
        None => NaiveDate::from_ymd_opt(year, 1, 1).ok_or("invalid current year")?,
    };
    let to = match args.to {
        Some(to) => to,
        None => NaiveDate::from_ymd_opt(from.year(), 12, 31).ok_or("invalid end of year")?,
    };
    print_json(&engine.calendar(from, to)?)
}

pub fn upcoming(days: Option<u32>, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let days = days.unwrap_or_else(|| Config::load_or_default().upcoming_days);
    let engine = open_engine(today)?;
    print_json(&engine.upcoming(days)?)
}
