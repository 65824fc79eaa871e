use super::ui;
use crate::core::asset::AssetClass;
use crate::core::config::AppConfig;
use crate::core::figure::{Figure, two_places};
use crate::core::portfolio::{Partition, PortfolioTotals, PositionReport};
use crate::core::replay::Valuation;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Everything `report --json` prints.
#[derive(Debug, Serialize)]
pub struct ReportOutput {
    pub valuation_date: NaiveDate,
    pub currency: String,
    pub positions: Vec<PositionReport>,
    pub totals: PortfolioTotals,
    pub annualized_return: Option<Decimal>,
}

impl ReportOutput {
    pub fn new(valuation: &Valuation, currency: &str) -> Self {
        ReportOutput {
            valuation_date: valuation.date,
            currency: currency.to_string(),
            positions: valuation.report(),
            totals: valuation.totals(),
            annualized_return: valuation.annualized_return(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn positions_table(&self) -> String {
        let currency = &self.currency;
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Ticker"),
            ui::header_cell("Class"),
            ui::header_cell("Since"),
            ui::header_cell("Units"),
            ui::header_cell("Cost/Unit"),
            ui::header_cell("Price"),
            ui::header_cell("FX"),
            ui::header_cell(&format!("Invested ({currency})")),
            ui::header_cell(&format!("Value ({currency})")),
            ui::header_cell(&format!("Sold ({currency})")),
            ui::header_cell(&format!("Dividends ({currency})")),
            ui::header_cell(&format!("Realized ({currency})")),
            ui::header_cell("Return (%)"),
            ui::header_cell("Real Return (%)"),
            ui::header_cell("XIRR (%)"),
        ]);

        for row in &self.positions {
            let ticker = if row.liquidated {
                format!("{} *", row.ticker)
            } else {
                row.ticker.clone()
            };
            let (_, emoji) = row.asset_class.display_info();
            table.add_row(vec![
                Cell::new(ticker),
                Cell::new(format!("{emoji} {}", row.asset_class)),
                Cell::new(row.first_purchase.map_or("N/A".to_string(), |d| d.to_string())),
                ui::number_cell(row.units),
                ui::number_cell(row.cost_basis_per_unit),
                ui::figure_cell(row.latest_price),
                ui::figure_cell(row.fx_rate),
                ui::figure_cell(row.init_value_local),
                ui::figure_cell(row.curr_value_reporting),
                ui::figure_cell(row.sold_value),
                ui::figure_cell(row.dividend_cash_accrual),
                ui::figure_cell(row.realized_pnl),
                ui::percent_cell(row.percent_return),
                ui::percent_cell(row.percent_return_cpi_adjusted),
                ui::rate_cell(row.annualized_return),
            ]);
        }
        table.to_string()
    }

    fn totals_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Partition"),
            ui::header_cell("Initial"),
            ui::header_cell("Current"),
            ui::header_cell("Returned"),
            ui::header_cell("Change (%)"),
        ]);

        let partitions = [
            ("All", Partition::All),
            ("All (inflation adjusted)", Partition::AllInflationAdjusted),
        ]
        .into_iter()
        .map(|(label, p)| (label.to_string(), p))
        .chain(
            AssetClass::ALL
                .into_iter()
                .map(|class| (class.to_string(), Partition::Class(class))),
        );

        for (label, partition) in partitions {
            let totals = self.totals.get(partition);
            table.add_row(vec![
                Cell::new(label),
                ui::figure_cell(totals.initial),
                ui::figure_cell(totals.current),
                ui::figure_cell(totals.returned),
                ui::percent_cell(totals.percent_change),
            ]);
        }
        table.to_string()
    }

    pub fn display_as_table(&self) -> String {
        let mut output = format!(
            "Portfolio as of {}\n\n",
            ui::style_text(&self.valuation_date.to_string(), ui::StyleType::Title)
        );

        output.push_str(&self.positions_table());
        if self.positions.iter().any(|row| row.liquidated) {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "* fully sold; return measured against the first purchase",
                    ui::StyleType::Subtle
                )
            ));
        }

        output.push_str("\n\n");
        output.push_str(&self.totals_table());

        let realized = self.totals.realized_pnl;
        let realized_style = if realized.is_available() {
            ui::StyleType::TotalValue
        } else {
            ui::StyleType::Error
        };
        output.push_str(&format!(
            "\n\nRealized P/L ({}): {}",
            ui::style_text(&self.currency, ui::StyleType::TotalLabel),
            ui::style_text(&realized.to_string(), realized_style)
        ));

        let xirr = self
            .annualized_return
            .map_or("N/A".to_string(), |r| format!("{:.2}%", two_places(r)));
        output.push_str(&format!(
            "\nPortfolio XIRR: {}",
            ui::style_text(&xirr, ui::StyleType::TotalLabel)
        ));

        if self.totals.all.current == Figure::Unavailable {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "Some prices or rates are missing, totals are incomplete",
                    ui::StyleType::Error
                )
            ));
        }
        output
    }
}

pub async fn run(config: &AppConfig, valuation_date: NaiveDate, json: bool) -> Result<()> {
    let valuation = super::valuate(config, valuation_date).await?;
    if valuation.portfolio.is_empty() {
        warn!("No ledger records on or before {valuation_date}");
    }
    let output = ReportOutput::new(&valuation, &config.currency);
    info!("Valued {} positions", output.positions.len());

    if json {
        println!("{}", output.to_json()?);
    } else {
        println!("{}", output.display_as_table());
    }
    Ok(())
}
