//! Dated value series (closing prices, FX rates, CPI index points).

use crate::core::figure::Figure;
use crate::core::ledger::deserialize_date;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value resolved for a requested date.
///
/// `resolved` is the date the value actually belongs to; it is never after
/// `requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub value: Decimal,
    pub requested: NaiveDate,
    pub resolved: NaiveDate,
}

impl Quote {
    pub fn age_days(&self) -> i64 {
        (self.requested - self.resolved).num_days()
    }

    pub fn is_stale(&self, max_age_days: i64) -> bool {
        self.age_days() > max_age_days
    }

    /// Converts to a figure; quotes older than `max_age_days` are approximate.
    pub fn to_figure(&self, max_age_days: i64) -> Figure {
        if self.is_stale(max_age_days) {
            Figure::Approximate(self.value)
        } else {
            Figure::Exact(self.value)
        }
    }
}

/// Chronological series with exactly one value per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: BTreeMap<NaiveDate, Decimal>,
}

#[derive(Debug, Deserialize)]
struct SeriesRow {
    #[serde(rename = "Date", alias = "date", deserialize_with = "deserialize_date")]
    date: NaiveDate,
    #[serde(
        rename = "Close",
        alias = "close",
        alias = "Index",
        alias = "index",
        alias = "Value",
        alias = "value",
        default,
        with = "rust_decimal::serde::str_option"
    )]
    value: Option<Decimal>,
}

impl Series {
    /// Builds a series, rejecting duplicate dates so every lookup is deterministic.
    pub fn from_points<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDate, Decimal)>,
    {
        let mut map = BTreeMap::new();
        for (date, value) in points {
            if map.insert(date, value).is_some() {
                bail!("Duplicate series entry for {date}");
            }
        }
        Ok(Series { points: map })
    }

    /// Parses `Date,Close` CSV text. Rows with an empty value are skipped
    /// (non-trading days exported as blanks).
    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for (index, row) in csv_reader.deserialize::<SeriesRow>().enumerate() {
            let row = row.with_context(|| format!("Malformed series row at line {}", index + 2))?;
            if let Some(value) = row.value {
                points.push((row.date, value));
            }
        }
        Self::from_points(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<(NaiveDate, Decimal)> {
        self.points.last_key_value().map(|(d, v)| (*d, *v))
    }

    /// Walks backward from `date` to the nearest date with data. Never looks
    /// forward.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<Quote> {
        self.points
            .range(..=date)
            .next_back()
            .map(|(resolved, value)| Quote {
                value: *value,
                requested: date,
                resolved: *resolved,
            })
    }
}
