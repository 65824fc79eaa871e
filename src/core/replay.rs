//! Single sequential pass over the ledger.

use crate::core::asset::{AssetClass, ClassificationRules};
use crate::core::figure::Figure;
use crate::core::inflation::InflationAdjuster;
use crate::core::ledger::{LedgerError, LedgerRecord};
use crate::core::oracle::{CurrencyPair, PriceOracle};
use crate::core::portfolio::{Portfolio, PortfolioTotals, PositionReport};
use crate::core::position::{EventContext, MarketSnapshot, Position};
use crate::core::returns::{self, CashFlows};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Parameters of one valuation run.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    /// Positions are valued at the latest close on or before this date;
    /// later ledger records are ignored.
    pub valuation_date: NaiveDate,
    /// Foreign quote currency into the reporting currency.
    pub pair: CurrencyPair,
    pub rules: ClassificationRules,
    /// Quotes resolved further back than this are reported as approximate.
    pub max_staleness_days: i64,
}

/// Outcome of a replay, returned by value.
#[derive(Debug, Clone)]
pub struct Valuation {
    pub date: NaiveDate,
    pub portfolio: Portfolio,
    pub cash_flows: CashFlows,
}

impl Valuation {
    pub fn totals(&self) -> PortfolioTotals {
        self.portfolio.totals()
    }

    /// Per-security rows including annualized returns.
    pub fn report(&self) -> Vec<PositionReport> {
        self.portfolio
            .positions()
            .map(|position| {
                let mut row = PositionReport::from(position);
                row.annualized_return = returns::annualized_return(
                    self.cash_flows.for_ticker(position.ticker()),
                    position.market_value(),
                    self.date,
                );
                row
            })
            .collect()
    }

    /// Annualized return of the whole portfolio.
    pub fn annualized_return(&self) -> Option<Decimal> {
        let terminal: Figure = self.portfolio.positions().map(|p| p.market_value()).sum();
        returns::annualized_return(self.cash_flows.all(), terminal, self.date)
    }
}

/// Replays `ledger` in order and values every position at
/// `settings.valuation_date`. Any [`LedgerError`] aborts the whole run.
pub fn replay(
    ledger: &[LedgerRecord],
    oracle: &dyn PriceOracle,
    inflation: &InflationAdjuster,
    settings: &ReplaySettings,
) -> Result<Valuation, LedgerError> {
    let mut portfolio = Portfolio::new();
    let mut cash_flows = CashFlows::new();
    let mut last_seen: HashMap<&str, NaiveDate> = HashMap::new();
    let mut skipped = 0usize;

    for record in ledger {
        if let Some(previous) = last_seen.get(record.ticker.as_str()) {
            if record.date < *previous {
                return Err(LedgerError::OutOfOrder {
                    ticker: record.ticker.clone(),
                    action: record.action,
                    date: record.date,
                    previous: *previous,
                });
            }
        }
        last_seen.insert(record.ticker.as_str(), record.date);

        if record.date > settings.valuation_date {
            skipped += 1;
            continue;
        }

        let asset_class = settings.rules.classify(&record.ticker);
        let ctx = EventContext {
            entry_fx: entry_fx(record, asset_class, oracle, settings),
            inflation,
        };
        debug!(
            ticker = %record.ticker,
            action = %record.action,
            date = %record.date,
            "Applying ledger record"
        );

        let cash_flow = portfolio.apply(record, &ctx, || {
            Position::open(
                &record.ticker,
                asset_class,
                market_snapshot(&record.ticker, asset_class, oracle, settings),
            )
        })?;
        cash_flows.push(&record.ticker, record.date, cash_flow);
    }

    if skipped > 0 {
        info!(
            "Ignored {skipped} ledger records dated after {}",
            settings.valuation_date
        );
    }

    Ok(Valuation {
        date: settings.valuation_date,
        portfolio,
        cash_flows,
    })
}

/// FX rate for a record's own date: domestic assets use 1, then the rate on
/// the record, then the oracle.
fn entry_fx(
    record: &LedgerRecord,
    asset_class: AssetClass,
    oracle: &dyn PriceOracle,
    settings: &ReplaySettings,
) -> Figure {
    if asset_class.forces_unit_fx() {
        return Figure::Exact(Decimal::ONE);
    }
    if let Some(rate) = record.fx_rate {
        return Figure::Exact(rate);
    }
    match oracle.fx_rate(&settings.pair, record.date) {
        Some(quote) => quote.to_figure(settings.max_staleness_days),
        None => {
            warn!(
                "No {} rate on or before {} for {} {}",
                settings.pair, record.date, record.ticker, record.action
            );
            Figure::Unavailable
        }
    }
}

fn market_snapshot(
    ticker: &str,
    asset_class: AssetClass,
    oracle: &dyn PriceOracle,
    settings: &ReplaySettings,
) -> MarketSnapshot {
    let date = settings.valuation_date;
    let price_quote = oracle.latest_close(ticker, date);
    let price = match price_quote {
        Some(quote) => {
            if quote.is_stale(settings.max_staleness_days) {
                warn!(
                    "Latest close for {ticker} is from {}, {} days before {date}",
                    quote.resolved,
                    quote.age_days()
                );
            }
            quote.to_figure(settings.max_staleness_days)
        }
        None => {
            warn!("No closing price for {ticker} on or before {date}");
            Figure::Unavailable
        }
    };

    let fx = if asset_class.forces_unit_fx() {
        Figure::Exact(Decimal::ONE)
    } else {
        match oracle.fx_rate(&settings.pair, date) {
            Some(quote) => quote.to_figure(settings.max_staleness_days),
            None => {
                warn!("No {} rate on or before {date}", settings.pair);
                Figure::Unavailable
            }
        }
    };

    MarketSnapshot::new(price, fx, price_quote.map(|q| q.resolved))
}
