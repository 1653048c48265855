//! Program registry commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use grantcast_core::Program;

use super::{open_engine, print_json};

#[derive(Subcommand)]
pub enum ProgramAction {
    /// Register or update a program
    Add {
        /// Program id
        id: String,
        /// Display name
        name: String,
        /// Preparation lead time in weeks
        #[arg(long, default_value_t = 8)]
        prep_weeks: u32,
        /// Historical acceptance rate (0.0-1.0)
        #[arg(long, default_value_t = 0.25)]
        success_rate: f64,
        /// Difficulty, 1 (easy) to 5 (hard)
        #[arg(long, default_value_t = 3)]
        difficulty: u8,
        /// Maximum award
        #[arg(long, default_value_t = 0)]
        max_amount: u64,
    },
    /// List registered programs
    List,
    /// Rank programs by priority score
    Rank,
}

pub fn run(action: ProgramAction, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;

    match action {
        ProgramAction::Add {
            id,
            name,
            prep_weeks,
            success_rate,
            difficulty,
            max_amount,
        } => {
            let program = Program::new(id, name)
                .with_prep_weeks(prep_weeks)
                .with_success_rate(success_rate)
                .with_difficulty(difficulty)
                .with_max_amount(max_amount);
            engine.add_program(&program)?;
            print_json(&program)?;
        }
        ProgramAction::List => print_json(&engine.programs()?)?,
        ProgramAction::Rank => print_json(&engine.rank_programs()?)?,
    }
    Ok(())
}
