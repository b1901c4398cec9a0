use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Warning,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Warning => style(text).yellow(),
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

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Right aligned cell for plain numbers.
pub fn number_cell(text: impl Into<String>) -> Cell {
    Cell::new(text.into()).set_alignment(CellAlignment::Right)
}

/// Money cell colored by sign: value created is green, value destroyed is red.
pub fn value_cell(amount: Decimal, symbol: &str) -> Cell {
    let color = if amount >= Decimal::ZERO {
        Color::Green
    } else {
        Color::Red
    };
    Cell::new(format_money(amount, symbol))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// `1234.5` with symbol `$` becomes `$1,234.50`; negatives become `-$15.00`.
pub fn format_money(amount: Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}{symbol}{grouped}.{cents}")
}

pub fn format_hours(hours: Decimal) -> String {
    format!("{:.1}h", hours.round_dp(1))
}

pub fn format_percent(percent: Decimal) -> String {
    format!("{:.1}%", percent.round_dp(1))
}

/// Text progress bar for a fraction in `0..=1`.
pub fn progress_line(fraction: Decimal, width: usize) -> String {
    let filled = (fraction.clamp(Decimal::ZERO, Decimal::ONE) * Decimal::from(width))
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

/// Spinner shown while waiting on the backend.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(dec!(1234.5), "$"), "$1,234.50");
        assert_eq!(format_money(dec!(100000), "€"), "€100,000.00");
        assert_eq!(format_money(dec!(-15), "C$"), "-C$15.00");
        assert_eq!(format_money(dec!(0), "£"), "£0.00");
        assert_eq!(format_money(dec!(999.999), "$"), "$1,000.00");
    }

    #[test]
    fn test_progress_line_clamps() {
        assert_eq!(progress_line(dec!(0.5), 4), "[██░░]");
        assert_eq!(progress_line(dec!(2), 4), "[████]");
        assert_eq!(progress_line(dec!(-1), 4), "[░░░░]");
    }

    #[test]
    fn test_hours_and_percent() {
        assert_eq!(format_hours(dec!(2.25)), "2.2h");
        assert_eq!(format_percent(dec!(85)), "85.0%");
    }
}
