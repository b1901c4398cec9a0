use super::ui;
use crate::core::guide::{
    HABIT_FAMILIES, HabitProjection, NEGATIVE_VALUE_HINTS, POSITIVE_VALUE_HINTS,
};
use crate::core::models::Currency;
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Renders the habit value guide. With `hours_per_week`, each habit also shows its yearly value.
pub fn render(currency: Currency, hours_per_week: Option<Decimal>) -> String {
    let symbol = currency.symbol();
    let mut output = format!(
        "{}\n",
        ui::style_text("Habit Value Guide", ui::StyleType::Title)
    );

    for family in HABIT_FAMILIES {
        let mut table = ui::new_styled_table();
        let mut header = vec![ui::header_cell("Habit"), ui::header_cell("Suggested Rate")];
        if hours_per_week.is_some() {
            header.push(ui::header_cell("Yearly Value"));
        }
        table.set_header(header);

        for habit in family.habits {
            let rate = Decimal::from(habit.rate);
            let mut row = vec![Cell::new(habit.name), ui::value_cell(rate, symbol)];
            if let Some(hours) = hours_per_week {
                let projection = HabitProjection::from_weekly_hours(hours, rate);
                row.push(ui::value_cell(projection.yearly, symbol));
            }
            table.add_row(row);
        }

        output.push_str(&format!(
            "\n{}\n{table}\n",
            ui::style_text(family.title, ui::StyleType::TotalLabel)
        ));
    }

    output.push_str(&format!(
        "\n{}\n",
        ui::style_text("Pricing value-generating habits", ui::StyleType::TotalLabel)
    ));
    for hint in POSITIVE_VALUE_HINTS {
        output.push_str(&format!("  - {hint}\n"));
    }
    output.push_str(&format!(
        "\n{}\n",
        ui::style_text("Pricing value-destroying habits", ui::StyleType::TotalLabel)
    ));
    for hint in NEGATIVE_VALUE_HINTS {
        output.push_str(&format!("  - {hint}\n"));
    }
    output
}

pub fn run(currency: Currency, hours_per_week: Option<Decimal>) {
    print!("{}", render(currency, hours_per_week));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_guide_lists_every_family() {
        console::set_colors_enabled(false);
        let output = render(Currency::Usd, None);
        for family in HABIT_FAMILIES {
            assert!(output.contains(family.title));
        }
        assert!(output.contains("-$20.00"));
        assert!(!output.contains("Yearly Value"));
    }

    #[test]
    fn test_guide_projects_yearly_value() {
        console::set_colors_enabled(false);
        let output = render(Currency::Eur, Some(dec!(5)));
        assert!(output.contains("Yearly Value"));
        // Exercise/Gym: 5h a week at 30/hour.
        assert!(output.contains("€7,800.00"));
    }
}
