//! Ledger records and the CSV reader that produces them.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "TRANSACTION")]
    Transaction,
    #[serde(rename = "DIVIDEND")]
    Dividend,
    #[serde(rename = "DIVIDEND-FIAT")]
    DividendFiat,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Action::Buy => "BUY",
                Action::Sell => "SELL",
                Action::Transaction => "TRANSACTION",
                Action::Dividend => "DIVIDEND",
                Action::DividendFiat => "DIVIDEND-FIAT",
            }
        )
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "TRANSACTION" => Ok(Action::Transaction),
            "DIVIDEND" => Ok(Action::Dividend),
            "DIVIDEND-FIAT" => Ok(Action::DividendFiat),
            _ => Err(anyhow::anyhow!("Invalid ledger action: {}", s)),
        }
    }
}

/// One immutable ledger event.
///
/// For [`Action::DividendFiat`] the cash amount is carried in `price` and
/// `units` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(rename = "Date", deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Action", deserialize_with = "deserialize_action")]
    pub action: Action,
    #[serde(rename = "Units", default, deserialize_with = "deserialize_units")]
    pub units: Decimal,
    #[serde(rename = "Price", default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
    #[serde(rename = "FX_Rate", default, with = "rust_decimal::serde::str_option")]
    pub fx_rate: Option<Decimal>,
}

impl LedgerRecord {
    /// Cash amount of a `DIVIDEND-FIAT` record.
    pub fn cash_amount(&self) -> Option<Decimal> {
        self.price
    }
}

/// Conditions that abort a replay.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("{action} of {requested} units of {ticker} exceeds the {held} units held")]
    InsufficientUnits {
        ticker: String,
        action: Action,
        requested: Decimal,
        held: Decimal,
    },

    #[error("{action} on {date} references {ticker}, which was never bought")]
    UnknownTicker {
        ticker: String,
        action: Action,
        date: NaiveDate,
    },

    #[error("{ticker} {action} dated {date} comes after a record dated {previous}")]
    OutOfOrder {
        ticker: String,
        action: Action,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("Malformed {action} record for {ticker}: {reason}")]
    Malformed {
        ticker: String,
        action: Action,
        reason: String,
    },
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow::anyhow!("Invalid date: {}", value))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

/// Empty unit cells (e.g. on `DIVIDEND-FIAT` rows) read as zero.
fn deserialize_units<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(rust_decimal::serde::str_option::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_action<'de, D>(deserializer: D) -> Result<Action, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Action::from_str(&raw).map_err(serde::de::Error::custom)
}

/// Reads ledger records from CSV text. Any malformed row fails the whole read.
pub fn read_ledger<R: std::io::Read>(reader: R) -> Result<Vec<LedgerRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv_reader.deserialize::<LedgerRecord>().enumerate() {
        // Header is line 1, so data rows start at line 2.
        let record = row.with_context(|| format!("Malformed ledger row at line {}", index + 2))?;
        records.push(record);
    }
    debug!("Read {} ledger records", records.len());
    Ok(records)
}

pub fn load_ledger<P: AsRef<Path>>(path: P) -> Result<Vec<LedgerRecord>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("Failed to open ledger: {}", path.as_ref().display()))?;
    read_ledger(file)
        .with_context(|| format!("Failed to parse ledger: {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reads_all_actions_and_date_formats() {
        let csv = "\
Date,Ticker,Action,Units,Price,FX_Rate
2021-01-04,CBA.AX,BUY,10,100.5,
05/01/2021,AAPL,BUY,2,130,1.30
2021-02-01,AAPL,DIVIDEND,0.1,,
2021-03-01,AAPL,DIVIDEND-FIAT,,4.25,1.28
2021-04-01,AAPL,sell,1,140,1.29
2021-05-01,AAPL,TRANSACTION,0.5,,
";
        let records = read_ledger(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
        assert_eq!(records[0].price, Some(dec!(100.5)));
        assert_eq!(records[0].fx_rate, None);
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2021, 1, 5).unwrap());
        assert_eq!(records[1].fx_rate, Some(dec!(1.30)));
        assert_eq!(records[2].action, Action::Dividend);
        assert_eq!(records[3].action, Action::DividendFiat);
        assert_eq!(records[3].cash_amount(), Some(dec!(4.25)));
        assert_eq!(records[3].units, Decimal::ZERO);
        assert_eq!(records[4].action, Action::Sell);
        assert_eq!(records[5].action, Action::Transaction);
    }

    #[test]
    fn keeps_every_decimal_digit() {
        let csv = "Date,Ticker,Action,Units,Price,FX_Rate\n\
2024-01-02,ETH-USD,BUY,0.123456789012345678,123456789.123456789,1.23456789012345678\n";
        let records = read_ledger(csv.as_bytes()).unwrap();

        assert_eq!(records[0].units, dec!(0.123456789012345678));
        assert_eq!(records[0].price, Some(dec!(123456789.123456789)));
        assert_eq!(records[0].fx_rate, Some(dec!(1.23456789012345678)));
    }

    #[test]
    fn rejects_unknown_action() {
        let csv = "Date,Ticker,Action,Units,Price,FX_Rate\n2021-01-04,CBA.AX,GIFT,1,1,\n";
        let err = read_ledger(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejects_unparseable_date() {
        let csv = "Date,Ticker,Action,Units,Price,FX_Rate\n2021-13-45,CBA.AX,BUY,1,1,\n";
        assert!(read_ledger(csv.as_bytes()).is_err());
    }

    #[test]
    fn action_display_matches_ledger_spelling() {
        assert_eq!(Action::DividendFiat.to_string(), "DIVIDEND-FIAT");
        assert_eq!("dividend-fiat".parse::<Action>().unwrap(), Action::DividendFiat);
    }
}
