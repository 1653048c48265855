//! Alert commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use grantcast_core::{AlertPriority, UserProfile};

use super::{open_engine, print_json};

#[derive(Subcommand)]
pub enum AlertsAction {
    /// List stored alerts, most urgent first
    List {
        /// Only these programs (repeatable)
        #[arg(long = "program")]
        programs: Vec<String>,
        /// Hide programs harder than this
        #[arg(long)]
        max_difficulty: Option<u8>,
        /// Hide programs awarding less than this
        #[arg(long)]
        min_amount: Option<u64>,
        /// high | medium | low
        #[arg(long)]
        min_priority: Option<AlertPriority>,
        /// Include dismissed alerts
        #[arg(long)]
        all: bool,
    },
    /// Generate the alerts due today and print the new ones
    Refresh,
    /// Mark an alert as read
    Read { id: String },
    /// Dismiss an alert
    Dismiss { id: String },
}

pub fn run(action: AlertsAction, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;

    match action {
        AlertsAction::List {
            programs,
            max_difficulty,
            min_amount,
            min_priority,
            all,
        } => {
            let profile = UserProfile {
                programs,
                max_difficulty,
                min_amount,
                min_priority,
                include_dismissed: all,
            };
            print_json(&engine.alerts(Some(&profile))?)?;
        }
        AlertsAction::Refresh => print_json(&engine.refresh_alerts()?)?,
        AlertsAction::Read { id } => {
            engine.mark_alert_read(&id)?;
            println!("ok");
        }
        AlertsAction::Dismiss { id } => {
            engine.dismiss_alert(&id)?;
            println!("ok");
        }
    }
    Ok(())
}
