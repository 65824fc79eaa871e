//! Reporting-currency amounts tagged with how much they can be trusted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::iter::Sum;
use std::ops::Add;

/// An amount that is either known exactly, derived from degraded inputs
/// (stale quotes, missing CPI data), or could not be computed at all.
///
/// Combining figures keeps the weakest kind, so a single unavailable input
/// makes the whole total unavailable instead of silently wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Figure {
    Exact(Decimal),
    Approximate(Decimal),
    Unavailable,
}

impl Figure {
    pub const ZERO: Figure = Figure::Exact(Decimal::ZERO);

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Figure::Exact(v) | Figure::Approximate(v) => Some(*v),
            Figure::Unavailable => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Figure::Exact(_))
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Figure::Unavailable)
    }

    /// Downgrades an exact figure to approximate.
    pub fn approximate(self) -> Figure {
        match self {
            Figure::Exact(v) => Figure::Approximate(v),
            other => other,
        }
    }

    /// Applies `f` to the amount, keeping the kind.
    pub fn map(self, f: impl FnOnce(Decimal) -> Decimal) -> Figure {
        match self {
            Figure::Exact(v) => Figure::Exact(f(v)),
            Figure::Approximate(v) => Figure::Approximate(f(v)),
            Figure::Unavailable => Figure::Unavailable,
        }
    }

    pub fn scale(self, factor: Decimal) -> Figure {
        self.map(|v| v * factor)
    }

    /// Multiplies two figures, e.g. a price by an FX rate.
    pub fn times(self, other: Figure) -> Figure {
        match (self, other) {
            (Figure::Unavailable, _) | (_, Figure::Unavailable) => Figure::Unavailable,
            (Figure::Exact(a), Figure::Exact(b)) => Figure::Exact(a * b),
            (a, b) => Figure::Approximate(a.value().unwrap_or_default() * b.value().unwrap_or_default()),
        }
    }

    /// Percentage change of `self` against `base`: `self / base * 100 - 100`.
    ///
    /// Returns `None` when the change is undefined, i.e. `base` is zero.
    pub fn percent_change_from(self, base: Figure) -> Option<Figure> {
        if base.value().is_some_and(|b| b.is_zero()) {
            return None;
        }
        match (self, base) {
            (Figure::Unavailable, _) | (_, Figure::Unavailable) => Some(Figure::Unavailable),
            (current, initial) => {
                let pct = current.value().unwrap_or_default() / initial.value().unwrap_or_default()
                    * Decimal::ONE_HUNDRED
                    - Decimal::ONE_HUNDRED;
                if current.is_exact() && initial.is_exact() {
                    Some(Figure::Exact(pct))
                } else {
                    Some(Figure::Approximate(pct))
                }
            }
        }
    }
}

impl Default for Figure {
    fn default() -> Self {
        Figure::ZERO
    }
}

impl From<Decimal> for Figure {
    fn from(value: Decimal) -> Self {
        Figure::Exact(value)
    }
}

impl Add for Figure {
    type Output = Figure;

    fn add(self, rhs: Figure) -> Figure {
        match (self, rhs) {
            (Figure::Unavailable, _) | (_, Figure::Unavailable) => Figure::Unavailable,
            (Figure::Exact(a), Figure::Exact(b)) => Figure::Exact(a + b),
            (a, b) => {
                Figure::Approximate(a.value().unwrap_or_default() + b.value().unwrap_or_default())
            }
        }
    }
}

impl Sum for Figure {
    fn sum<I: Iterator<Item = Figure>>(iter: I) -> Self {
        iter.fold(Figure::ZERO, |acc, f| acc + f)
    }
}

/// Two-decimal rendering: `~` marks approximate values.
/// Rounds to two places, halves away from zero. Every printed or stored
/// two-decimal value goes through here.
pub fn two_places(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Figure::Exact(v) => write!(f, "{:.2}", two_places(*v)),
            Figure::Approximate(v) => write!(f, "~{:.2}", two_places(*v)),
            Figure::Unavailable => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn addition_keeps_weakest_kind() {
        let exact = Figure::Exact(dec!(10));
        let approx = Figure::Approximate(dec!(5));

        assert_eq!(exact + exact, Figure::Exact(dec!(20)));
        assert_eq!(exact + approx, Figure::Approximate(dec!(15)));
        assert_eq!(approx + Figure::Unavailable, Figure::Unavailable);
    }

    #[test]
    fn sum_of_empty_iterator_is_exact_zero() {
        let total: Figure = Vec::<Figure>::new().into_iter().sum();
        assert_eq!(total, Figure::ZERO);
    }

    #[test]
    fn percent_change_guards_zero_base() {
        assert_eq!(Figure::Exact(dec!(50)).percent_change_from(Figure::ZERO), None);
        assert_eq!(
            Figure::Exact(dec!(150)).percent_change_from(Figure::Exact(dec!(100))),
            Some(Figure::Exact(dec!(50)))
        );
        assert_eq!(
            Figure::Unavailable.percent_change_from(Figure::Exact(dec!(100))),
            Some(Figure::Unavailable)
        );
    }

    #[test]
    fn display_marks_approximate_and_missing() {
        assert_eq!(Figure::Exact(dec!(1.005)).to_string(), "1.01");
        assert_eq!(Figure::Exact(dec!(-1.005)).to_string(), "-1.01");
        assert_eq!(Figure::Exact(dec!(12.344)).to_string(), "12.34");
        assert_eq!(Figure::Approximate(dec!(2.5)).to_string(), "~2.50");
        assert_eq!(Figure::Unavailable.to_string(), "N/A");
    }
}
