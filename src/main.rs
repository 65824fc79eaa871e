use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use foliotrack::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for foliotrack::AppCommand {
    fn from(cmd: Commands) -> foliotrack::AppCommand {
        match cmd {
            Commands::Report { json, date } => foliotrack::AppCommand::Report { json, date },
            Commands::Track { date } => foliotrack::AppCommand::Track { date },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    foliotrack::core::ledger::parse_date(value)
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Value every position and print the portfolio report
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Valuation date (YYYY-MM-DD or DD/MM/YYYY), defaults to today
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Append the portfolio value to the value history
    Track {
        /// Valuation date (YYYY-MM-DD or DD/MM/YYYY), defaults to today
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => foliotrack::cli::setup::setup(),
        Some(cmd) => foliotrack::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
