//! Per-security ledger state and its transitions.
//!
//! A [`Position`] is never mutated in place: [`Position::apply`] folds one
//! ledger record into a new state, so a rejected record leaves the previous
//! state untouched and replays are deterministic.

use crate::core::asset::AssetClass;
use crate::core::figure::Figure;
use crate::core::inflation::InflationAdjuster;
use crate::core::ledger::{Action, LedgerError, LedgerRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Latest price and FX rate used to value a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub price: Figure,
    pub fx: Figure,
    pub as_of: Option<NaiveDate>,
}

impl MarketSnapshot {
    pub fn new(price: Figure, fx: Figure, as_of: Option<NaiveDate>) -> Self {
        MarketSnapshot { price, fx, as_of }
    }

    pub fn unavailable() -> Self {
        MarketSnapshot {
            price: Figure::Unavailable,
            fx: Figure::Unavailable,
            as_of: None,
        }
    }

    /// Price of one unit in the reporting currency.
    pub fn unit_value(&self) -> Figure {
        self.price.times(self.fx)
    }
}

/// Inputs a transition needs besides the record itself.
pub struct EventContext<'a> {
    /// FX rate in effect on the record's date.
    pub entry_fx: Figure,
    pub inflation: &'a InflationAdjuster,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct FirstPurchase {
    date: NaiveDate,
    value: Figure,
    value_real: Figure,
}

/// Result of folding one record into a position.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub position: Position,
    /// Contribution to the portfolio's realized P/L.
    pub realized: Figure,
    /// Cash moved by the event in reporting currency: negative when invested,
    /// positive when returned. Zero for events that move no cash.
    pub cash_flow: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    ticker: String,
    asset_class: AssetClass,
    market: MarketSnapshot,
    units: Decimal,
    cost_basis_per_unit: Decimal,
    sold_units: Decimal,
    sold_avg_price: Decimal,
    sold_value: Figure,
    init_value_local: Figure,
    init_value_inflation_adjusted: Figure,
    first_purchase: Option<FirstPurchase>,
    dividend_unit_accrual: Decimal,
    dividend_cash_accrual: Figure,
    realized_pnl: Figure,
}

impl Position {
    /// An empty position awaiting its first BUY.
    pub fn open(ticker: &str, asset_class: AssetClass, market: MarketSnapshot) -> Self {
        let market = if asset_class.forces_unit_fx() {
            MarketSnapshot {
                fx: Figure::Exact(Decimal::ONE),
                ..market
            }
        } else {
            market
        };

        Position {
            ticker: ticker.to_string(),
            asset_class,
            market,
            units: Decimal::ZERO,
            cost_basis_per_unit: Decimal::ZERO,
            sold_units: Decimal::ZERO,
            sold_avg_price: Decimal::ZERO,
            sold_value: Figure::ZERO,
            init_value_local: Figure::ZERO,
            init_value_inflation_adjusted: Figure::ZERO,
            first_purchase: None,
            dividend_unit_accrual: Decimal::ZERO,
            dividend_cash_accrual: Figure::ZERO,
            realized_pnl: Figure::ZERO,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    pub fn market(&self) -> &MarketSnapshot {
        &self.market
    }

    pub fn units(&self) -> Decimal {
        self.units
    }

    pub fn cost_basis_per_unit(&self) -> Decimal {
        self.cost_basis_per_unit
    }

    pub fn sold_units(&self) -> Decimal {
        self.sold_units
    }

    pub fn sold_avg_price(&self) -> Decimal {
        self.sold_avg_price
    }

    pub fn sold_value(&self) -> Figure {
        self.sold_value
    }

    pub fn init_value_local(&self) -> Figure {
        self.init_value_local
    }

    pub fn init_value_inflation_adjusted(&self) -> Figure {
        self.init_value_inflation_adjusted
    }

    pub fn dividend_unit_accrual(&self) -> Decimal {
        self.dividend_unit_accrual
    }

    pub fn dividend_cash_accrual(&self) -> Figure {
        self.dividend_cash_accrual
    }

    pub fn realized_pnl(&self) -> Figure {
        self.realized_pnl
    }

    pub fn first_purchase_date(&self) -> Option<NaiveDate> {
        self.first_purchase.map(|p| p.date)
    }


    /// Bought at least once and every unit has since been disposed of.
    pub fn is_liquidated(&self) -> bool {
        self.first_purchase.is_some() && self.units.is_zero()
    }

    /// `units * latest_price * fx`; zero once liquidated.
    pub fn market_value(&self) -> Figure {
        if self.units.is_zero() {
            return Figure::ZERO;
        }
        self.market.unit_value().scale(self.units)
    }

    /// Live valuation: market value plus cash dividends received. Forced to
    /// zero after a full sell-down.
    pub fn curr_value_reporting(&self) -> Figure {
        if self.units.is_zero() {
            return Figure::ZERO;
        }
        self.market_value() + self.dividend_cash_accrual
    }

    fn total_return_value(&self) -> Figure {
        self.market_value() + self.sold_value + self.dividend_cash_accrual
    }

    /// Nominal total return in percent; `None` when there is no cost basis.
    pub fn percent_return(&self) -> Option<Figure> {
        self.total_return_value()
            .percent_change_from(self.init_value_local)
    }

    /// Total return against the inflation-adjusted cost basis.
    pub fn percent_return_cpi_adjusted(&self) -> Option<Figure> {
        self.total_return_value()
            .percent_change_from(self.init_value_inflation_adjusted)
    }

    /// Folds `record` into a new state. Errors leave `self` as it was.
    pub fn apply(
        &self,
        record: &LedgerRecord,
        ctx: &EventContext<'_>,
    ) -> Result<Transition, LedgerError> {
        let entry_fx = if self.asset_class.forces_unit_fx() {
            Figure::Exact(Decimal::ONE)
        } else {
            ctx.entry_fx
        };

        let mut next = self.clone();
        let mut realized = Figure::ZERO;
        let mut cash_flow = Figure::ZERO;

        match record.action {
            Action::Buy => {
                let units = positive_units(record)?;
                let price = required_price(record)?;
                let cost = Figure::Exact(units * price).times(entry_fx);
                let cost_real = ctx.inflation.adjust(cost, record.date);

                match self.first_purchase {
                    None => {
                        next.units = units;
                        next.cost_basis_per_unit = price;
                        next.init_value_local = cost;
                        next.init_value_inflation_adjusted = cost_real;
                        next.first_purchase = Some(FirstPurchase {
                            date: record.date,
                            value: cost,
                            value_real: cost_real,
                        });
                    }
                    Some(_) => {
                        let total_units = self.units + units;
                        next.cost_basis_per_unit =
                            (self.cost_basis_per_unit * self.units + price * units) / total_units;
                        next.units = total_units;
                        next.init_value_local = self.init_value_local + cost;
                        next.init_value_inflation_adjusted =
                            self.init_value_inflation_adjusted + cost_real;
                    }
                }
                cash_flow = cost.scale(Decimal::NEGATIVE_ONE);
            }
            Action::Sell => {
                let units = positive_units(record)?;
                let price = required_price(record)?;
                self.ensure_held(record, units)?;

                let proceeds = Figure::Exact(units * price).times(entry_fx);
                next.dispose(units, Some(price), proceeds);
                realized = Figure::Exact((price - self.cost_basis_per_unit) * units).times(entry_fx);
                cash_flow = proceeds;
            }
            Action::Transaction => {
                let units = positive_units(record)?;
                self.ensure_held(record, units)?;

                let proceeds = self.market.unit_value().scale(units);
                next.dispose(units, self.market.price.value(), proceeds);
                cash_flow = proceeds;
            }
            Action::Dividend => {
                let units = positive_units(record)?;
                next.units = self.units + units;
                next.dividend_unit_accrual = self.dividend_unit_accrual + units;
                realized = self.market.unit_value().scale(units);
            }
            Action::DividendFiat => {
                let amount = record
                    .cash_amount()
                    .filter(|a| *a > Decimal::ZERO)
                    .ok_or_else(|| malformed(record, "cash amount must be positive"))?;
                let cash = Figure::Exact(amount).times(entry_fx);
                next.dividend_cash_accrual = self.dividend_cash_accrual + cash;
                cash_flow = cash;
            }
        }

        next.realized_pnl = self.realized_pnl + realized;
        Ok(Transition {
            position: next,
            realized,
            cash_flow,
        })
    }

    fn ensure_held(&self, record: &LedgerRecord, units: Decimal) -> Result<(), LedgerError> {
        if units > self.units {
            return Err(LedgerError::InsufficientUnits {
                ticker: self.ticker.clone(),
                action: record.action,
                requested: units,
                held: self.units,
            });
        }
        Ok(())
    }

    /// Removes `units` from the holding. A disposal without a known price
    /// leaves `sold_avg_price` as it was; the missing value shows up in
    /// `sold_value`.
    fn dispose(&mut self, units: Decimal, price: Option<Decimal>, proceeds: Figure) {
        if let Some(price) = price {
            self.sold_avg_price = (self.sold_avg_price * self.sold_units + price * units)
                / (self.sold_units + units);
        }
        self.sold_units += units;
        self.units -= units;
        self.sold_value = self.sold_value + proceeds;

        // Full liquidation keeps the first purchase as the return denominator.
        if self.units.is_zero() {
            if let Some(first) = self.first_purchase {
                self.init_value_local = first.value;
                self.init_value_inflation_adjusted = first.value_real;
            }
        }
    }
}

fn malformed(record: &LedgerRecord, reason: &str) -> LedgerError {
    LedgerError::Malformed {
        ticker: record.ticker.clone(),
        action: record.action,
        reason: reason.to_string(),
    }
}

fn positive_units(record: &LedgerRecord) -> Result<Decimal, LedgerError> {
    if record.units > Decimal::ZERO {
        Ok(record.units)
    } else {
        Err(malformed(record, "units must be positive"))
    }
}

fn required_price(record: &LedgerRecord) -> Result<Decimal, LedgerError> {
    match record.price {
        Some(price) if price >= Decimal::ZERO => Ok(price),
        Some(_) => Err(malformed(record, "price must not be negative")),
        None => Err(malformed(record, "price is required")),
    }
}
