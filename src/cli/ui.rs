use crate::core::figure::{Figure, two_places};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned cell for a plain decimal.
pub fn number_cell(value: Decimal) -> Cell {
    Cell::new(format!("{:.2}", two_places(value))).set_alignment(CellAlignment::Right)
}

/// Amount cell; approximate figures are yellow, unavailable ones grey.
pub fn figure_cell(figure: Figure) -> Cell {
    let cell = Cell::new(figure.to_string()).set_alignment(CellAlignment::Right);
    match figure {
        Figure::Exact(_) => cell,
        Figure::Approximate(_) => cell.fg(Color::Yellow),
        Figure::Unavailable => cell.fg(Color::DarkGrey),
    }
}

/// Percentage cell with color coding. `None` means a zero denominator.
pub fn percent_cell(change: Option<Figure>) -> Cell {
    let Some(figure) = change else {
        return Cell::new("undefined")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right);
    };
    let cell = Cell::new(format!("{figure}%")).set_alignment(CellAlignment::Right);
    match figure.value() {
        Some(v) if v >= Decimal::ZERO => cell.fg(Color::Green),
        Some(_) => cell.fg(Color::Red),
        None => Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
    }
}

/// Formats an annualized rate, "N/A" when it could not be solved.
pub fn rate_cell(rate: Option<Decimal>) -> Cell {
    rate.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |r| {
            Cell::new(format!("{:.2}%", two_places(r)))
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right)
        },
    )
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    if let Ok(progress_style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(progress_style.progress_chars("#>-"));
    }
    pb
}
