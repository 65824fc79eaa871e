use super::ui;
use crate::core::config::AppConfig;
use crate::core::figure::Figure;
use crate::core::history::ValueHistory;
use crate::core::replay::Valuation;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Adds the valuation's portfolio total to `history`.
///
/// `Value` is the live valuation (`totals.all.current`, holdings plus cash
/// dividends, no sale proceeds). `Percentage` is the total return of the
/// `All` partition: market value plus sale proceeds plus cash dividends
/// against the cost basis. After a sale the two columns therefore move apart.
pub fn record_valuation(history: &mut ValueHistory, valuation: &Valuation) -> Result<()> {
    let totals = valuation.totals();
    let value = match totals.all.current {
        Figure::Exact(v) => v,
        Figure::Approximate(v) => {
            warn!("Recording approximate portfolio value for {}", valuation.date);
            v
        }
        Figure::Unavailable => bail!(
            "Portfolio value on {} is unavailable, not recording history",
            valuation.date
        ),
    };
    let percentage = totals.all.percent_change.and_then(|p| p.value());
    history.record(valuation.date, value, percentage);
    Ok(())
}

pub async fn run(config: &AppConfig, valuation_date: NaiveDate) -> Result<()> {
    let valuation = super::valuate(config, valuation_date).await?;
    let path = config.history_path()?;

    let mut history = ValueHistory::load(&path)?;
    record_valuation(&mut history, &valuation)?;
    history.save(&path)?;
    info!("Saved value history to {}", path.display());

    if let Some(entry) = history.entries().last() {
        let pct = entry
            .percentage
            .map_or("undefined".to_string(), |p| format!("{p:.2}%"));
        println!(
            "{} {} ({})",
            ui::style_text(&entry.date.to_string(), ui::StyleType::TotalLabel),
            ui::style_text(
                &format!("{:.2} {}", entry.value, config.currency),
                ui::StyleType::TotalValue
            ),
            pct
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::ClassificationRules;
    use crate::core::inflation::InflationAdjuster;
    use crate::core::ledger::{Action, LedgerRecord};
    use crate::core::oracle::{CurrencyPair, MarketData};
    use crate::core::replay::{ReplaySettings, replay};
    use crate::core::series::Series;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn record(d: u32, action: Action, units: Decimal, price: Decimal) -> LedgerRecord {
        LedgerRecord {
            date: date(d),
            ticker: "VAS.AX".to_string(),
            action,
            units,
            price: Some(price),
            fx_rate: None,
        }
    }

    #[test]
    fn value_excludes_proceeds_but_percentage_includes_them() -> Result<()> {
        let ledger = vec![
            record(1, Action::Buy, dec!(10), dec!(100)),
            record(10, Action::Sell, dec!(5), dec!(120)),
        ];
        let market = MarketData::new().with_prices(
            "VAS.AX",
            Series::from_points([(date(20), dec!(110))])?,
        );
        let settings = ReplaySettings {
            valuation_date: date(20),
            pair: CurrencyPair::new("USD", "AUD"),
            rules: ClassificationRules::default(),
            max_staleness_days: 5,
        };
        let valuation = replay(&ledger, &market, &InflationAdjuster::unavailable(), &settings)?;

        let mut history = ValueHistory::default();
        record_valuation(&mut history, &valuation)?;

        let entry = &history.entries()[0];
        assert_eq!(entry.value, dec!(550));
        // (550 + 600) / 1000
        assert_eq!(entry.percentage, Some(dec!(15)));
        Ok(())
    }
}
