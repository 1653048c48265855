//! Confirmed window commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use grantcast_core::{ValidationError, WindowKey, WindowRecord, WindowStatus};

use super::{open_engine, parse_date, print_json};

#[derive(Subcommand)]
pub enum WindowAction {
    /// Record a confirmed window
    Add {
        program: String,
        year: i32,
        /// Round within the year, starting at 1
        slot: u32,
        /// Opening date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        /// Closing date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        /// Result announcement date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        result: Option<NaiveDate>,
        /// Budget of the round
        #[arg(long)]
        budget: Option<u64>,
    },
    /// List confirmed windows
    List {
        /// Only this program
        #[arg(long)]
        program: Option<String>,
    },
    /// Change the status of a window
    Status {
        program: String,
        year: i32,
        slot: u32,
        /// scheduled | active | closed | completed | cancelled
        status: WindowStatus,
    },
    /// Apply every date-driven status change due today
    Advance,
}

pub fn run(action: WindowAction, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;

    match action {
        WindowAction::Add {
            program,
            year,
            slot,
            start,
            end,
            result,
            budget,
        } => {
            let mut record = WindowRecord::new(program, year, slot, start);
            record.end_date = end;
            record.result_date = result;
            record.budget = budget;
            if !engine.add_window(&record)? {
                return Err(ValidationError::DuplicateWindow(record.key()).into());
            }
            print_json(&record)?;
        }
        WindowAction::List { program } => print_json(&engine.windows(program.as_deref())?)?,
        WindowAction::Status {
            program,
            year,
            slot,
            status,
        } => {
            let record = engine.update_status(&WindowKey::new(program, year, slot), status)?;
            print_json(&record)?;
        }
        WindowAction::Advance => print_json(&engine.advance_statuses()?)?,
    }
    Ok(())
}
