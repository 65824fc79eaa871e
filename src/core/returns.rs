//! Money-weighted (XIRR) returns from ledger cash flows.

use crate::core::figure::Figure;
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use rust_finprim::rate::xirr;
use std::collections::BTreeMap;
use tracing::debug;

/// Dated cash flows per ticker in reporting currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashFlows {
    flows: BTreeMap<String, Vec<(NaiveDate, Figure)>>,
}

impl CashFlows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a flow; zero flows (e.g. unit dividends) are dropped.
    pub fn push(&mut self, ticker: &str, date: NaiveDate, amount: Figure) {
        if amount == Figure::ZERO {
            return;
        }
        self.flows
            .entry(ticker.to_string())
            .or_default()
            .push((date, amount));
    }

    pub fn for_ticker(&self, ticker: &str) -> &[(NaiveDate, Figure)] {
        self.flows.get(ticker).map_or(&[], Vec::as_slice)
    }

    pub fn all(&self) -> impl Iterator<Item = &(NaiveDate, Figure)> {
        self.flows.values().flatten()
    }
}

fn days_since_epoch(date: &NaiveDate) -> i32 {
    date.num_days_from_ce() - NaiveDate::from_ymd_opt(1970, 1, 1).map_or(0, |d| d.num_days_from_ce())
}

const DAYS_PER_YEAR: Decimal = dec!(365);
const TOLERANCE: Decimal = dec!(0.00001);
/// Annual rates searched, -95% to +10,000%.
const MIN_RATE: Decimal = dec!(-0.95);
const MAX_RATE: Decimal = dec!(100);
const MAX_BISECTIONS: usize = 200;

/// Net present value at `rate`, discounting to the first flow. `None` when a
/// discount factor (or the solver's derivative of it) leaves `Decimal` range.
fn checked_xnpv(rate: Decimal, flows: &[(Decimal, i32)]) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    let start = flows.first()?.1;
    flows.iter().try_fold(Decimal::ZERO, |npv, &(amount, day)| {
        let years = Decimal::from(day - start).checked_div(DAYS_PER_YEAR)?;
        base.checked_powd(years + Decimal::ONE)?;
        let factor = base.checked_powd(years)?;
        npv.checked_add(amount.checked_div(factor)?)
    })
}

/// Moves `bound` toward zero until the NPV there can be evaluated.
fn evaluable_bound(mut bound: Decimal, flows: &[(Decimal, i32)]) -> Option<(Decimal, Decimal)> {
    for _ in 0..16 {
        if let Some(npv) = checked_xnpv(bound, flows) {
            return Some((bound, npv));
        }
        bound /= Decimal::TWO;
    }
    None
}

/// Annualized simple return of the whole history, used to tighten the bracket.
fn simple_rate(flows: &[(Decimal, i32)]) -> Option<Decimal> {
    let invested: Decimal = flows
        .iter()
        .filter(|(amount, _)| amount.is_sign_negative())
        .map(|(amount, _)| -*amount)
        .sum();
    let returned: Decimal = flows
        .iter()
        .filter(|(amount, _)| amount.is_sign_positive())
        .map(|(amount, _)| *amount)
        .sum();
    let span = flows.last()?.1 - flows.first()?.1;
    let exponent = DAYS_PER_YEAR.checked_div(Decimal::from(span))?;
    returned
        .checked_div(invested)?
        .checked_powd(exponent)?
        .checked_sub(Decimal::ONE)
}

/// Brackets the root between [`MIN_RATE`] and [`MAX_RATE`] and bisects it
/// down to [`TOLERANCE`]. `None` when no rate in range zeroes the NPV.
fn bracketed_rate(flows: &[(Decimal, i32)]) -> Option<Decimal> {
    let (mut lo, mut npv_lo) = evaluable_bound(MIN_RATE, flows)?;
    let (mut hi, npv_hi) = evaluable_bound(MAX_RATE, flows)?;
    if npv_lo.is_zero() {
        return Some(lo);
    }
    if npv_hi.is_zero() {
        return Some(hi);
    }
    if npv_lo.is_sign_negative() == npv_hi.is_sign_negative() {
        debug!("No annual rate between {lo} and {hi} balances the cash flows");
        return None;
    }

    if let Some(seed) = simple_rate(flows).filter(|r| *r > lo && *r < hi) {
        if let Some(npv) = checked_xnpv(seed, flows) {
            if npv.abs() < TOLERANCE {
                return Some(seed);
            }
            if npv.is_sign_negative() == npv_lo.is_sign_negative() {
                (lo, npv_lo) = (seed, npv);
            } else {
                hi = seed;
            }
        }
    }

    for _ in 0..MAX_BISECTIONS {
        let mid = (lo + hi) / Decimal::TWO;
        let npv = checked_xnpv(mid, flows)?;
        if npv.abs() < TOLERANCE || mid == lo || mid == hi {
            return Some(mid);
        }
        if npv.is_sign_negative() == npv_lo.is_sign_negative() {
            (lo, npv_lo) = (mid, npv);
        } else {
            hi = mid;
        }
    }
    let mid = (lo + hi) / Decimal::TWO;
    checked_xnpv(mid, flows).map(|_| mid)
}

/// Annualized return in percent of `flows` closed out by `terminal_value` on
/// `valuation_date`. `None` when any flow is unavailable, all cash moves on
/// one day, or no rate in the searched range fits (e.g. a few days' holding
/// whose annualized figure runs off the scale).
pub fn annualized_return<'a, I>(
    flows: I,
    terminal_value: Figure,
    valuation_date: NaiveDate,
) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a (NaiveDate, Figure)>,
{
    let mut cash_flows = Vec::new();
    for (date, amount) in flows {
        cash_flows.push((amount.value()?, days_since_epoch(date)));
    }
    let terminal = terminal_value.value()?;
    if !terminal.is_zero() {
        cash_flows.push((terminal, days_since_epoch(&valuation_date)));
    }
    // Discounting starts at the first flow.
    cash_flows.sort_by_key(|(_, day)| *day);

    let has_outflow = cash_flows.iter().any(|(amount, _)| *amount < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|(amount, _)| *amount > Decimal::ZERO);
    if !has_outflow || !has_inflow {
        debug!("XIRR needs both invested and returned cash, skipping");
        return None;
    }
    if cash_flows.first().map(|f| f.1) == cash_flows.last().map(|f| f.1) {
        debug!("All cash flows fall on one day, no annualized return");
        return None;
    }

    let guess = bracketed_rate(&cash_flows)?;
    match xirr(&cash_flows, Some(guess), Some(TOLERANCE)) {
        Ok(rate) => Some(rate * Decimal::ONE_HUNDRED),
        Err(e) => {
            debug!("XIRR computation error: {:?}", e);
            None
        }
    }
}
