use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "grantcast", version, about = "Grant window forecasting CLI")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Evaluate as of this date (YYYY-MM-DD) instead of the system clock
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Program registry
    Program {
        #[command(subcommand)]
        action: commands::program::ProgramAction,
    },
    /// Confirmed windows
    Window {
        #[command(subcommand)]
        action: commands::window::WindowAction,
    },
    /// Load programs and windows from a JSON file
    Import {
        /// Path to the JSON batch
        path: std::path::PathBuf,
    },
    /// Forecast a program's windows for a year
    Forecast(commands::forecast::ForecastArgs),
    /// Recompute forecasts for every program
    Recompute {
        /// Target year (defaults to the current year)
        year: Option<i32>,
    },
    /// Month-by-month calendar of confirmed and predicted windows
    Calendar(commands::calendar::CalendarArgs),
    /// Windows opening soon
    Upcoming {
        /// Horizon in days (defaults to `upcoming_days` from the config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Deadline and opportunity alerts
    Alerts {
        #[command(subcommand)]
        action: commands::alerts::AlertsAction,
    },
    /// Yearly activity and trend of a program
    Trend {
        program: String,
    },
    /// Monthly distribution of window openings across programs
    Seasonal,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GRANTCAST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("grantcast={level},grantcast_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("grantcast v{} starting", env!("CARGO_PKG_VERSION"));

    let today = match cli.today.as_deref().map(commands::parse_date).transpose() {
        Ok(today) => today,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Program { action } => commands::program::run(action, today),
        Commands::Window { action } => commands::window::run(action, today),
        Commands::Import { path } => commands::import::run(&path, today),
        Commands::Forecast(args) => commands::forecast::run(args, today),
        Commands::Recompute { year } => commands::forecast::recompute(year, today),
        Commands::Calendar(args) => commands::calendar::run(args, today),
        Commands::Upcoming { days } => commands::calendar::upcoming(days, today),
        Commands::Alerts { action } => commands::alerts::run(action, today),
        Commands::Trend { program } => commands::trend::run(&program, today),
        Commands::Seasonal => commands::trend::seasonal(today),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            commands::completions::run(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
