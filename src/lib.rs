pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

pub enum AppCommand {
    Report {
        json: bool,
        date: Option<NaiveDate>,
    },
    Track {
        date: Option<NaiveDate>,
    },
}

fn valuation_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("foliotrack starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Report { json, date } => {
            cli::report::run(&config, valuation_date(date), json).await
        }
        AppCommand::Track { date } => cli::track::run(&config, valuation_date(date)).await,
    }
}
