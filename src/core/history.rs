//! Daily record of portfolio value, one row per date.

use crate::core::figure::two_places;
use crate::core::ledger::parse_date;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    /// Live portfolio value in reporting currency.
    pub value: Decimal,
    /// Total return in percent, sale proceeds included; `None` when nothing
    /// was invested.
    pub percentage: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Value", with = "rust_decimal::serde::str")]
    value: Decimal,
    #[serde(rename = "Percentage", default, with = "rust_decimal::serde::str_option")]
    percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueHistory {
    entries: Vec<HistoryEntry>,
}

impl ValueHistory {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Appends today's figures, or replaces them when the last row is
    /// already for `date`. Values are kept to two decimals.
    pub fn record(&mut self, date: NaiveDate, value: Decimal, percentage: Option<Decimal>) {
        let entry = HistoryEntry {
            date,
            value: two_places(value),
            percentage: percentage.map(two_places),
        };
        match self.entries.last_mut() {
            Some(last) if last.date == date => {
                debug!("Updating history row for {date}");
                *last = entry;
            }
            _ => {
                debug!("Appending history row for {date}");
                self.entries.push(entry);
            }
        }
    }

    pub fn read<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();
        for (index, row) in csv_reader.deserialize::<HistoryRow>().enumerate() {
            let row = row.with_context(|| format!("Malformed history row at line {}", index + 2))?;
            entries.push(HistoryEntry {
                date: parse_date(&row.date)?,
                value: row.value,
                percentage: row.percentage,
            });
        }
        Ok(ValueHistory { entries })
    }

    pub fn write<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            csv_writer.serialize(HistoryRow {
                date: entry.date.format(DATE_FORMAT).to_string(),
                value: entry.value,
                percentage: entry.percentage,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Loads the history file, or starts empty when it does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No history at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open history: {}", path.display()))?;
        Self::read(file).with_context(|| format!("Failed to parse history: {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to write history: {}", path.display()))?;
        self.write(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    #[test]
    fn same_day_overwrites_and_new_day_appends() {
        let mut history = ValueHistory::default();
        history.record(date(1), dec!(1000.123), Some(dec!(5.555)));
        history.record(date(1), dec!(1010), Some(dec!(6)));
        history.record(date(2), dec!(990), None);

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, dec!(1010));
        assert_eq!(entries[1].date, date(2));
        assert_eq!(entries[1].percentage, None);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let mut history = ValueHistory::default();
        history.record(date(1), dec!(1000.126), Some(dec!(5.554)));
        assert_eq!(history.entries()[0].value, dec!(1000.13));
        assert_eq!(history.entries()[0].percentage, Some(dec!(5.55)));

        history.record(date(1), dec!(1000.125), Some(dec!(-5.555)));
        assert_eq!(history.entries()[0].value, dec!(1000.13));
        assert_eq!(history.entries()[0].percentage, Some(dec!(-5.56)));
    }

    #[test]
    fn survives_save_and_load() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("history.csv");

        assert!(ValueHistory::load(&path)?.entries().is_empty());

        let mut history = ValueHistory::default();
        history.record(date(3), dec!(1234.5), Some(dec!(-2.25)));
        history.save(&path)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with("Date,Value,Percentage"));
        assert_eq!(ValueHistory::load(&path)?, history);
        Ok(())
    }

    #[test]
    fn reads_day_first_dates() -> Result<()> {
        let csv = "Date,Value,Percentage\n01/08/2024,100.5,1.2\n";
        let history = ValueHistory::read(csv.as_bytes())?;
        assert_eq!(history.entries()[0].date, date(1));
        Ok(())
    }
}
