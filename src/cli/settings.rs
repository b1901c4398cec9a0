use super::ui;
use crate::core::models::{Settings, SettingsUpdate};
use crate::core::store::{Session, TrackerStore};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;

pub fn settings_table(settings: &Settings) -> String {
    let symbol = settings.currency.symbol();
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Setting"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Savings goal"),
        ui::number_cell(ui::format_money(settings.savings_goal, symbol)),
    ]);
    table.add_row(vec![
        Cell::new("Currency"),
        ui::number_cell(format!("{} ({symbol})", settings.currency)),
    ]);
    table.add_row(vec![
        Cell::new("Goal date"),
        ui::number_cell(settings.goal_date.to_string()),
    ]);
    table.to_string()
}

pub async fn show(store: &dyn TrackerStore, session: &Session) -> Result<()> {
    let settings = store
        .get_settings(session)
        .await
        .context("Failed to load settings")?;
    println!("{}", settings_table(&settings));
    Ok(())
}

pub async fn set(store: &dyn TrackerStore, session: &Session, update: SettingsUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to change. Pass --goal, --currency or --goal-date");
    }
    let settings = store
        .upsert_settings(session, update)
        .await
        .context("Failed to save settings")?;
    println!("Settings saved.");
    println!("{}", settings_table(&settings));
    Ok(())
}
