pub mod report;
pub mod setup;
pub mod track;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::inflation::InflationAdjuster;
use crate::core::ledger::load_ledger;
use crate::core::oracle::MarketData;
use crate::core::replay::{ReplaySettings, Valuation, replay};
use crate::providers::csv_series::{CsvSeriesSource, read_series_file};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Loads the ledger and market data named by `config` and replays the ledger
/// as of `valuation_date`.
pub async fn valuate(config: &AppConfig, valuation_date: NaiveDate) -> Result<Valuation> {
    let ledger = load_ledger(&config.data.ledger)?;
    info!(
        "Loaded {} ledger records from {}",
        ledger.len(),
        config.data.ledger.display()
    );

    let tickers: Vec<String> = ledger
        .iter()
        .map(|record| record.ticker.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Loading prices...");
    let source = CsvSeriesSource::new(&config.data.prices_dir);
    let market = MarketData::load(&source, &tickers, &config.currency_pair(), &|| pb.inc(1)).await;
    pb.finish_and_clear();
    let market = market?;

    let inflation = match &config.data.cpi {
        Some(path) => {
            let cpi = read_series_file(path).await?;
            if cpi.is_empty() {
                warn!("CPI series {} has no data, real returns will be approximate", path.display());
            }
            InflationAdjuster::new(cpi)
        }
        None => {
            warn!("No CPI series configured, real returns will be approximate");
            InflationAdjuster::unavailable()
        }
    };

    let settings = ReplaySettings {
        valuation_date,
        pair: config.currency_pair(),
        rules: config.classification.clone(),
        max_staleness_days: config.max_staleness_days,
    };
    debug!(?settings, "Replaying ledger");

    Ok(replay(&ledger, &market, &inflation, &settings)?)
}
