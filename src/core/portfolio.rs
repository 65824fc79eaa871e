//! Folds per-security positions into portfolio totals and report rows.
use crate::core::asset::AssetClass;
use crate::core::figure::Figure;
use crate::core::ledger::{Action, LedgerError, LedgerRecord};
use crate::core::position::{EventContext, Position};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Addresses one slice of [`PortfolioTotals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    All,
    AllInflationAdjusted,
    Class(AssetClass),
}

/// Summed values of one partition, in reporting currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PartitionTotals {
    /// Cost basis; inflation-adjusted for [`Partition::AllInflationAdjusted`].
    pub initial: Figure,
    /// Sum of live valuations.
    pub current: Figure,
    /// Market value plus disposal proceeds plus cash dividends.
    pub returned: Figure,
    /// `returned / initial * 100 - 100`; `None` when `initial` is zero.
    pub percent_change: Option<Figure>,
}

impl PartitionTotals {
    fn from_parts(initial: Figure, current: Figure, returned: Figure) -> Self {
        PartitionTotals {
            initial,
            current,
            returned,
            percent_change: returned.percent_change_from(initial),
        }
    }
}

/// Fixed-shape totals for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioTotals {
    pub all: PartitionTotals,
    pub all_inflation_adjusted: PartitionTotals,
    pub domestic: PartitionTotals,
    pub foreign_equity: PartitionTotals,
    pub crypto: PartitionTotals,
    pub realized_pnl: Figure,
}

impl PortfolioTotals {
    pub fn get(&self, partition: Partition) -> &PartitionTotals {
        match partition {
            Partition::All => &self.all,
            Partition::AllInflationAdjusted => &self.all_inflation_adjusted,
            Partition::Class(AssetClass::Domestic) => &self.domestic,
            Partition::Class(AssetClass::ForeignEquity) => &self.foreign_equity,
            Partition::Class(AssetClass::Crypto) => &self.crypto,
        }
    }
}

/// One row of the per-security report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub ticker: String,
    pub asset_class: AssetClass,
    pub units: Decimal,
    pub cost_basis_per_unit: Decimal,
    pub first_purchase: Option<NaiveDate>,
    pub latest_price: Figure,
    pub price_as_of: Option<NaiveDate>,
    pub fx_rate: Figure,
    pub sold_units: Decimal,
    pub sold_avg_price: Decimal,
    pub sold_value: Figure,
    pub init_value_local: Figure,
    pub init_value_inflation_adjusted: Figure,
    pub curr_value_reporting: Figure,
    pub dividend_unit_accrual: Decimal,
    pub dividend_cash_accrual: Figure,
    pub realized_pnl: Figure,
    pub percent_return: Option<Figure>,
    pub percent_return_cpi_adjusted: Option<Figure>,
    /// Percent return is measured against the first purchase only.
    pub liquidated: bool,
    /// Annualized money-weighted return in percent, when it could be solved.
    pub annualized_return: Option<Decimal>,
}

impl From<&Position> for PositionReport {
    fn from(position: &Position) -> Self {
        PositionReport {
            ticker: position.ticker().to_string(),
            asset_class: position.asset_class(),
            units: position.units(),
            cost_basis_per_unit: position.cost_basis_per_unit(),
            first_purchase: position.first_purchase_date(),
            latest_price: position.market().price,
            price_as_of: position.market().as_of,
            fx_rate: position.market().fx,
            sold_units: position.sold_units(),
            sold_avg_price: position.sold_avg_price(),
            sold_value: position.sold_value(),
            init_value_local: position.init_value_local(),
            init_value_inflation_adjusted: position.init_value_inflation_adjusted(),
            curr_value_reporting: position.curr_value_reporting(),
            dividend_unit_accrual: position.dividend_unit_accrual(),
            dividend_cash_accrual: position.dividend_cash_accrual(),
            realized_pnl: position.realized_pnl(),
            percent_return: position.percent_return(),
            percent_return_cpi_adjusted: position.percent_return_cpi_adjusted(),
            liquidated: position.is_liquidated(),
            annualized_return: None,
        }
    }
}

/// Owns every position of one run plus the realized P/L accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    positions: BTreeMap<String, Position>,
    realized_pnl: Figure,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `record` to its position, opening one with `open` on the first
    /// BUY. Returns the cash flow of the event.
    pub fn apply(
        &mut self,
        record: &LedgerRecord,
        ctx: &EventContext<'_>,
        open: impl FnOnce() -> Position,
    ) -> Result<Figure, LedgerError> {
        let transition = match self.positions.get(&record.ticker) {
            Some(position) => position.apply(record, ctx)?,
            None if record.action == Action::Buy => {
                debug!("Opening position for {}", record.ticker);
                open().apply(record, ctx)?
            }
            None => {
                return Err(LedgerError::UnknownTicker {
                    ticker: record.ticker.clone(),
                    action: record.action,
                    date: record.date,
                });
            }
        };

        self.realized_pnl = self.realized_pnl + transition.realized;
        self.positions
            .insert(record.ticker.clone(), transition.position);
        Ok(transition.cash_flow)
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    /// Positions in lexicographic ticker order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn realized_pnl(&self) -> Figure {
        self.realized_pnl
    }

    /// Recomputes every partition from the current positions.
    pub fn totals(&self) -> PortfolioTotals {
        let partition = |filter: &dyn Fn(&Position) -> bool, real: bool| {
            let selected: Vec<&Position> = self.positions().filter(|p| filter(*p)).collect();
            let initial: Figure = selected
                .iter()
                .map(|p| {
                    if real {
                        p.init_value_inflation_adjusted()
                    } else {
                        p.init_value_local()
                    }
                })
                .sum();
            let current: Figure = selected.iter().map(|p| p.curr_value_reporting()).sum();
            let returned: Figure = selected
                .iter()
                .map(|p| p.market_value() + p.sold_value() + p.dividend_cash_accrual())
                .sum();
            PartitionTotals::from_parts(initial, current, returned)
        };
        let class = |class: AssetClass| partition(&move |p: &Position| p.asset_class() == class, false);

        PortfolioTotals {
            all: partition(&|_| true, false),
            all_inflation_adjusted: partition(&|_| true, true),
            domestic: class(AssetClass::Domestic),
            foreign_equity: class(AssetClass::ForeignEquity),
            crypto: class(AssetClass::Crypto),
            realized_pnl: self.realized_pnl,
        }
    }

    pub fn report(&self) -> Vec<PositionReport> {
        self.positions().map(PositionReport::from).collect()
    }
}
