use super::ui;
use crate::core::guide;
use crate::core::models::{Category, CategoryDraft, CategoryId};
use crate::core::store::{Session, TrackerStore};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Fields to change on an existing habit; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitEdit {
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub description: Option<String>,
}

pub fn habits_table(categories: &[Category], symbol: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Habit"),
        ui::header_cell("Rate"),
        ui::header_cell("Description"),
    ]);
    for category in categories {
        let rate = ui::value_cell(category.rate, symbol);
        table.add_row(vec![
            ui::number_cell(category.id.to_string()),
            Cell::new(&category.name),
            rate,
            Cell::new(category.description.as_deref().unwrap_or("")),
        ]);
    }
    table.to_string()
}

pub async fn list(store: &dyn TrackerStore, session: &Session) -> Result<()> {
    let (categories, settings) =
        futures::try_join!(store.list_categories(), store.get_settings(session))
            .context("Failed to load habits")?;
    if categories.is_empty() {
        println!("No habits yet. Add one with `hourpot habit add NAME --rate RATE`.");
        return Ok(());
    }
    println!("{}", habits_table(&categories, settings.currency.symbol()));
    println!(
        "{}",
        ui::style_text("Rates are per hour of logged time.", ui::StyleType::Subtle)
    );
    Ok(())
}

pub async fn add(
    store: &dyn TrackerStore,
    name: String,
    rate: Decimal,
    description: Option<String>,
) -> Result<()> {
    let category = store
        .add_category(CategoryDraft {
            name,
            rate,
            description,
        })
        .await
        .context("Failed to add habit")?;
    println!(
        "Added habit {} '{}' at {}/hour",
        category.id, category.name, category.rate
    );
    if let Some(hint) = rate_hint(&category) {
        println!("{}", ui::style_text(&hint, ui::StyleType::Subtle));
    }
    Ok(())
}

/// Mentions the guide's rate when the habit matches a known one at a different rate.
fn rate_hint(category: &Category) -> Option<String> {
    let suggested = guide::suggestion(&category.name)?;
    let rate = Decimal::from(suggested.rate);
    (rate != category.rate).then(|| {
        format!(
            "The habit guide suggests {}/hour for '{}'.",
            rate, suggested.name
        )
    })
}

pub async fn update(store: &dyn TrackerStore, id: CategoryId, changes: HabitEdit) -> Result<()> {
    if changes == HabitEdit::default() {
        bail!("Nothing to change. Pass --name, --rate or --description");
    }
    let current = store.get_category(id).await?;
    let draft = CategoryDraft {
        name: changes.name.unwrap_or(current.name),
        rate: changes.rate.unwrap_or(current.rate),
        description: changes.description.or(current.description),
    };
    let category = store
        .update_category(id, draft)
        .await
        .with_context(|| format!("Failed to update habit {id}"))?;
    println!(
        "Updated habit {} '{}' at {}/hour. Existing activities keep their value.",
        category.id, category.name, category.rate
    );
    Ok(())
}

pub async fn delete(store: &dyn TrackerStore, id: CategoryId) -> Result<()> {
    store
        .delete_category(id)
        .await
        .with_context(|| format!("Failed to delete habit {id}"))?;
    println!("Deleted habit {id}");
    Ok(())
}
