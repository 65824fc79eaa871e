//! Price and FX lookup abstractions

use crate::core::series::{Quote, Series};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, warn};

/// Converts amounts quoted in `base` into `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        CurrencyPair {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    /// Series key, e.g. `USDAUD`.
    pub fn series_key(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Resolves closing prices and FX rates by walking backward from the
/// requested date. A returned [`Quote`] carries the date it was resolved to.
pub trait PriceOracle {
    fn latest_close(&self, ticker: &str, on_or_before: NaiveDate) -> Option<Quote>;
    fn fx_rate(&self, pair: &CurrencyPair, on_or_before: NaiveDate) -> Option<Quote>;
}

/// Supplies raw series by key (a ticker or a currency pair's series key).
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// `Ok(None)` when the source has no series for `key`.
    async fn load_series(&self, key: &str) -> Result<Option<Series>>;
}

/// In-memory oracle over preloaded series.
#[derive(Debug, Default, Clone)]
pub struct MarketData {
    prices: HashMap<String, Series>,
    rates: HashMap<CurrencyPair, Series>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_prices(&mut self, ticker: &str, series: Series) {
        self.prices.insert(ticker.to_string(), series);
    }

    pub fn insert_rates(&mut self, pair: CurrencyPair, series: Series) {
        self.rates.insert(pair, series);
    }

    pub fn with_prices(mut self, ticker: &str, series: Series) -> Self {
        self.insert_prices(ticker, series);
        self
    }

    pub fn with_rates(mut self, pair: CurrencyPair, series: Series) -> Self {
        self.insert_rates(pair, series);
        self
    }

    /// Loads every ticker's prices and the FX series concurrently.
    ///
    /// A missing series is logged and left out, so lookups for it come back
    /// unavailable. Malformed series fail the load.
    pub async fn load(
        source: &dyn SeriesSource,
        tickers: &[String],
        pair: &CurrencyPair,
        update_callback: &(dyn Fn() + Sync),
    ) -> Result<Self> {
        let fx_key = pair.series_key();
        let price_futures = tickers.iter().map(|ticker| async move {
            let result = source.load_series(ticker).await;
            update_callback();
            (ticker.clone(), result)
        });
        let (prices, rates) = futures::join!(join_all(price_futures), source.load_series(&fx_key));

        let mut market = MarketData::new();
        for (ticker, result) in prices {
            match result? {
                Some(series) => {
                    debug!("Loaded {} closes for {}", series.len(), ticker);
                    market.insert_prices(&ticker, series);
                }
                None => warn!("No price series found for {ticker}"),
            }
        }
        match rates? {
            Some(series) => {
                debug!("Loaded {} {} rates", series.len(), pair);
                market.insert_rates(pair.clone(), series);
            }
            None => warn!("No FX series found for {pair} ({fx_key})"),
        }
        Ok(market)
    }
}

impl PriceOracle for MarketData {
    fn latest_close(&self, ticker: &str, on_or_before: NaiveDate) -> Option<Quote> {
        self.prices.get(ticker)?.on_or_before(on_or_before)
    }

    fn fx_rate(&self, pair: &CurrencyPair, on_or_before: NaiveDate) -> Option<Quote> {
        self.rates.get(pair)?.on_or_before(on_or_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct StaticSource {
        series: HashMap<String, Series>,
    }

    #[async_trait]
    impl SeriesSource for StaticSource {
        async fn load_series(&self, key: &str) -> Result<Option<Series>> {
            if key == "BROKEN" {
                anyhow::bail!("Malformed series for {key}");
            }
            Ok(self.series.get(key).cloned())
        }
    }

    #[tokio::test]
    async fn loads_available_series_and_skips_missing() {
        let source = StaticSource {
            series: HashMap::from([
                (
                    "AAPL".to_string(),
                    Series::from_points([(date(2024, 1, 5), dec!(180))]).unwrap(),
                ),
                (
                    "USDAUD".to_string(),
                    Series::from_points([(date(2024, 1, 5), dec!(1.5))]).unwrap(),
                ),
            ]),
        };
        let pair = CurrencyPair::new("USD", "AUD");
        let loaded = std::sync::atomic::AtomicUsize::new(0);
        let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];

        let market = MarketData::load(&source, &tickers, &pair, &|| {
            loaded.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert_eq!(loaded.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(market.latest_close("AAPL", date(2024, 1, 6)).is_some());
        assert!(market.latest_close("MSFT", date(2024, 1, 6)).is_none());
        assert!(market.fx_rate(&pair, date(2024, 1, 6)).is_some());

        let broken = MarketData::load(&source, &["BROKEN".to_string()], &pair, &|| ()).await;
        assert!(broken.is_err());
    }

    #[test]
    fn resolves_prices_and_rates_independently() {
        let pair = CurrencyPair::new("usd", "aud");
        let market = MarketData::new()
            .with_prices(
                "AAPL",
                Series::from_points([(date(2024, 1, 5), dec!(180))]).unwrap(),
            )
            .with_rates(
                pair.clone(),
                Series::from_points([(date(2024, 1, 4), dec!(1.49))]).unwrap(),
            );

        let price = market.latest_close("AAPL", date(2024, 1, 7)).unwrap();
        assert_eq!(price.value, dec!(180));
        assert_eq!(price.resolved, date(2024, 1, 5));

        let rate = market.fx_rate(&pair, date(2024, 1, 7)).unwrap();
        assert_eq!(rate.value, dec!(1.49));
        assert_eq!(pair.series_key(), "USDAUD");
        assert_eq!(pair.to_string(), "USD/AUD");

        assert!(market.latest_close("MSFT", date(2024, 1, 7)).is_none());
        assert!(market.latest_close("AAPL", date(2024, 1, 1)).is_none());
    }
}
