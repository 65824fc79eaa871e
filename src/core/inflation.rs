//! Converts nominal amounts into present-day purchasing power.

use crate::core::figure::Figure;
use crate::core::series::Series;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// CPI-based adjuster for one locale. The reference level is the latest
/// point of the series.
#[derive(Debug, Clone, Default)]
pub struct InflationAdjuster {
    cpi: Series,
}

impl InflationAdjuster {
    pub fn new(cpi: Series) -> Self {
        InflationAdjuster { cpi }
    }

    /// An adjuster without data; every adjustment falls back to nominal.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Real value of `amount` spent on `date`.
    ///
    /// Missing CPI data yields the nominal amount marked approximate.
    pub fn adjust(&self, amount: Figure, date: NaiveDate) -> Figure {
        let Some((_, reference)) = self.cpi.last() else {
            debug!("No CPI series loaded, keeping nominal value for {date}");
            return amount.approximate();
        };

        match self.cpi.on_or_before(date) {
            Some(point) if !point.value.is_zero() => {
                let factor: Decimal = reference / point.value;
                amount.scale(factor)
            }
            _ => {
                warn!("No CPI data on or before {date}, using nominal value");
                amount.approximate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn adjuster() -> InflationAdjuster {
        InflationAdjuster::new(
            Series::from_points([
                (date(2020, 1, 1), dec!(100)),
                (date(2021, 1, 1), dec!(110)),
                (date(2022, 1, 1), dec!(125)),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn scales_by_reference_over_point_in_time() {
        let adjuster = adjuster();

        assert_eq!(
            adjuster.adjust(Figure::Exact(dec!(1000)), date(2020, 6, 30)),
            Figure::Exact(dec!(1250))
        );
        assert_eq!(
            adjuster.adjust(Figure::Exact(dec!(1000)), date(2022, 3, 1)),
            Figure::Exact(dec!(1000))
        );
    }

    #[test]
    fn falls_back_to_nominal_before_series_start() {
        let adjusted = adjuster().adjust(Figure::Exact(dec!(1000)), date(2019, 12, 31));
        assert_eq!(adjusted, Figure::Approximate(dec!(1000)));
    }

    #[test]
    fn empty_series_is_approximate() {
        let adjuster = InflationAdjuster::unavailable();
        assert_eq!(
            adjuster.adjust(Figure::Exact(dec!(10)), date(2020, 1, 1)),
            Figure::Approximate(dec!(10))
        );
        assert_eq!(
            adjuster.adjust(Figure::Unavailable, date(2020, 1, 1)),
            Figure::Unavailable
        );
    }
}
