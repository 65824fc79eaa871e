use foliotrack::AppCommand;
use foliotrack::core::config::AppConfig;
use foliotrack::core::history::ValueHistory;
use foliotrack::core::{Figure, LedgerError, Partition};
use rust_decimal_macros::dec;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use super::*;

    pub const LEDGER: &str = "\
Date,Ticker,Action,Units,Price,FX_Rate
2024-01-02,VAS.AX,BUY,10,90,
2024-01-03,AAPL,BUY,5,180,1.5
15/02/2024,VAS.AX,DIVIDEND-FIAT,,25,
2024-03-01,AAPL,SELL,2,190,1.5
";

    pub const CONFIG: &str = "\
data:
  ledger: ledger.csv
  prices_dir: prices
  cpi: cpi.csv
  history: out/history.csv
currency: AUD
foreign_currency: USD
max_staleness_days: 5
";

    /// Lays out a config, ledger, price files and CPI series in `dir`.
    pub fn write_fixture(dir: &Path, ledger: &str) -> PathBuf {
        let prices = dir.join("prices");
        fs::create_dir_all(&prices).unwrap();
        fs::write(
            prices.join("VAS.AX.csv"),
            "Date,Close\n2024-01-02,90\n2024-04-01,100\n",
        )
        .unwrap();
        fs::write(
            prices.join("AAPL.csv"),
            "Date,Open,Close\n2024-01-03,179,180\n2024-04-01,199,200\n",
        )
        .unwrap();
        fs::write(
            prices.join("USDAUD.csv"),
            "Date,Close\n2024-01-02,1.5\n2024-04-01,1.5\n",
        )
        .unwrap();
        fs::write(
            dir.join("cpi.csv"),
            "Date,Index\n2024-01-01,100\n2024-04-01,102\n",
        )
        .unwrap();
        fs::write(dir.join("ledger.csv"), ledger).unwrap();

        let config_path = dir.join("config.yaml");
        fs::write(&config_path, CONFIG).unwrap();
        config_path
    }

    pub fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}

use test_utils::date;

#[test_log::test(tokio::test)]
async fn test_valuation_from_files() {
    let dir = TempDir::new().unwrap();
    let config_path = test_utils::write_fixture(dir.path(), test_utils::LEDGER);
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let valuation = foliotrack::cli::valuate(&config, date(2024, 4, 2))
        .await
        .unwrap();
    let totals = valuation.totals();
    info!(?totals, "Valued fixture portfolio");

    // VAS.AX: 10 * 100 + 25 cash dividend
    let vas = valuation.portfolio.position("VAS.AX").unwrap();
    assert_eq!(vas.curr_value_reporting(), Figure::Exact(dec!(1025)));

    // AAPL: 3 * 200 * 1.5 remaining, (190 - 180) * 2 * 1.5 realized
    let aapl = valuation.portfolio.position("AAPL").unwrap();
    assert_eq!(aapl.market_value(), Figure::Exact(dec!(900)));
    assert_eq!(totals.realized_pnl, Figure::Exact(dec!(30)));

    let domestic = totals.get(Partition::Class(foliotrack::core::AssetClass::Domestic));
    assert_eq!(domestic.initial, Figure::Exact(dec!(900)));
    assert_eq!(totals.all.current, Figure::Exact(dec!(1925)));

    let report = valuation.report();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].ticker, "AAPL");
    assert!(report.iter().all(|row| !row.liquidated));
}

#[test_log::test(tokio::test)]
async fn test_report_and_track_commands() {
    let dir = TempDir::new().unwrap();
    let config_path = test_utils::write_fixture(dir.path(), test_utils::LEDGER);
    let config_path = config_path.to_str().unwrap();

    for json in [false, true] {
        foliotrack::run_command(
            AppCommand::Report {
                json,
                date: Some(date(2024, 4, 2)),
            },
            Some(config_path),
        )
        .await
        .unwrap();
    }

    for day in [2, 2, 3] {
        foliotrack::run_command(
            AppCommand::Track {
                date: Some(date(2024, 4, day)),
            },
            Some(config_path),
        )
        .await
        .unwrap();
    }

    let history = ValueHistory::load(dir.path().join("out").join("history.csv")).unwrap();
    let entries = history.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, date(2024, 4, 2));
    assert_eq!(entries[0].value, dec!(1925));
    assert_eq!(entries[1].date, date(2024, 4, 3));
}

#[test_log::test(tokio::test)]
async fn test_oversell_aborts_before_output() {
    let dir = TempDir::new().unwrap();
    let ledger = format!("{}2024-03-02,VAS.AX,SELL,11,95,\n", test_utils::LEDGER);
    let config_path = test_utils::write_fixture(dir.path(), &ledger);
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let err = foliotrack::cli::valuate(&config, date(2024, 4, 2))
        .await
        .unwrap_err();
    let ledger_err = err.downcast_ref::<LedgerError>().unwrap();
    assert!(matches!(
        ledger_err,
        LedgerError::InsufficientUnits { ticker, .. } if ticker == "VAS.AX"
    ));
    assert!(err.to_string().contains("VAS.AX"));
}

#[test_log::test(tokio::test)]
async fn test_malformed_ledger_names_the_row() {
    let dir = TempDir::new().unwrap();
    let ledger = format!("{}2024-03-05,VAS.AX,HOLD,1,90,\n", test_utils::LEDGER);
    let config_path = test_utils::write_fixture(dir.path(), &ledger);

    let err = foliotrack::run_command(
        AppCommand::Report {
            json: false,
            date: Some(date(2024, 4, 2)),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("line 6"));
}

#[test_log::test(tokio::test)]
async fn test_missing_price_file_is_flagged_not_fatal() {
    let dir = TempDir::new().unwrap();
    let ledger = format!("{}2024-03-05,MSFT,BUY,1,400,1.5\n", test_utils::LEDGER);
    let config_path = test_utils::write_fixture(dir.path(), &ledger);
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let valuation = foliotrack::cli::valuate(&config, date(2024, 4, 2))
        .await
        .unwrap();
    let msft = valuation.portfolio.position("MSFT").unwrap();
    assert_eq!(msft.market_value(), Figure::Unavailable);
    assert_eq!(valuation.totals().all.current, Figure::Unavailable);

    // A history row cannot be written without a value.
    let result = foliotrack::run_command(
        AppCommand::Track {
            date: Some(date(2024, 4, 2)),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.unwrap_err().to_string().contains("unavailable"));
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file() {
    let result = foliotrack::run_command(
        AppCommand::Report {
            json: true,
            date: None,
        },
        Some("/nonexistent/foliotrack/config.yaml"),
    )
    .await;
    assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
}
