use super::ui;
use crate::core::models::{Category, LogDraft, LogEntry, LogId};
use crate::core::series;
use crate::core::store::{Session, TrackerStore};
use crate::core::tracker::{BulkAction, Tracker};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::info;

/// Fields to change on an existing activity; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityEdit {
    pub date: Option<NaiveDate>,
    pub hours: Option<Decimal>,
    pub category: Option<String>,
    pub note: Option<String>,
}

/// Bulk edit as typed on the command line, with the habit still given by name.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkEdit {
    AdjustHours(Decimal),
    Category(String),
    AppendNote(String),
    Delete,
}

fn habit_name(categories: &[Category], id: i64) -> &str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or(series::UNKNOWN_CATEGORY, |c| c.name.as_str())
}

pub async fn log(
    store: &dyn TrackerStore,
    session: &Session,
    hours: Decimal,
    category: &str,
    note: Option<String>,
    date: NaiveDate,
) -> Result<()> {
    let category = store.find_category(category).await?;
    let symbol = store.get_settings(session).await?.currency.symbol();

    let entry = Tracker::new(store, session)
        .log_activity(LogDraft {
            date,
            hours,
            category_id: category.id,
            note,
        })
        .await
        .context("Failed to log activity")?;

    println!(
        "Logged {} of {} on {}: {}",
        ui::format_hours(entry.hours),
        category.name,
        entry.date,
        ui::format_money(entry.value, symbol)
    );
    Ok(())
}

pub fn entries_table(entries: &[LogEntry], categories: &[Category], symbol: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Date"),
        ui::header_cell("Habit"),
        ui::header_cell("Hours"),
        ui::header_cell("Value"),
        ui::header_cell("Note"),
    ]);
    for entry in entries {
        table.add_row(vec![
            ui::number_cell(entry.id.to_string()),
            Cell::new(entry.date.to_string()),
            Cell::new(habit_name(categories, entry.category_id)),
            ui::number_cell(ui::format_hours(entry.hours)),
            ui::value_cell(entry.value, symbol),
            Cell::new(entry.note.as_deref().unwrap_or("")),
        ]);
    }
    table.to_string()
}

pub async fn list(store: &dyn TrackerStore, session: &Session, limit: usize) -> Result<()> {
    let (categories, logs, settings) = futures::try_join!(
        store.list_categories(),
        store.list_logs(session),
        store.get_settings(session),
    )
    .context("Failed to load activities")?;

    if logs.is_empty() {
        println!("No activities logged yet.");
        return Ok(());
    }
    let recent = series::recent(&logs, limit);
    println!(
        "{}",
        entries_table(&recent, &categories, settings.currency.symbol())
    );
    println!(
        "{}",
        ui::style_text(
            &format!("Showing {} of {} activities", recent.len(), logs.len()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

pub async fn edit(
    store: &dyn TrackerStore,
    session: &Session,
    id: LogId,
    changes: ActivityEdit,
) -> Result<()> {
    if changes == ActivityEdit::default() {
        bail!("Nothing to change. Pass --date, --hours, --category or --note");
    }
    let mut draft = store.get_log(session, id).await?.to_draft();
    if let Some(date) = changes.date {
        draft.date = date;
    }
    if let Some(hours) = changes.hours {
        draft.hours = hours;
    }
    if let Some(name) = changes.category {
        draft.category_id = store.find_category(&name).await?.id;
    }
    if let Some(note) = changes.note {
        draft.note = Some(note);
    }

    let entry = Tracker::new(store, session)
        .edit_activity(id, draft)
        .await
        .with_context(|| format!("Failed to update activity {id}"))?;
    let symbol = store.get_settings(session).await?.currency.symbol();
    println!(
        "Updated activity {}: {} on {}, now worth {}",
        entry.id,
        ui::format_hours(entry.hours),
        entry.date,
        ui::format_money(entry.value, symbol)
    );
    Ok(())
}

pub async fn delete(store: &dyn TrackerStore, session: &Session, id: LogId) -> Result<()> {
    Tracker::new(store, session)
        .delete_activity(id)
        .await
        .with_context(|| format!("Failed to delete activity {id}"))?;
    println!("Deleted activity {id}");
    Ok(())
}

pub async fn bulk(
    store: &dyn TrackerStore,
    session: &Session,
    ids: &[LogId],
    edit: BulkEdit,
) -> Result<()> {
    if ids.is_empty() {
        bail!("No activity ids given");
    }
    let action = match edit {
        BulkEdit::AdjustHours(delta) => BulkAction::AdjustHours(delta),
        BulkEdit::Category(name) => BulkAction::ChangeCategory(store.find_category(&name).await?.id),
        BulkEdit::AppendNote(text) => BulkAction::AppendNote(text),
        BulkEdit::Delete => BulkAction::Delete,
    };

    let outcome = Tracker::new(store, session).bulk_apply(ids, &action).await;
    info!(
        succeeded = outcome.succeeded,
        failed = outcome.failures.len(),
        "Bulk edit finished"
    );
    println!(
        "Updated {} of {} activities",
        outcome.succeeded,
        outcome.attempted()
    );
    for (id, error) in &outcome.failures {
        println!(
            "  {}",
            ui::style_text(&format!("activity {id}: {error}"), ui::StyleType::Error)
        );
    }
    if !outcome.failures.is_empty() {
        bail!("{} activities could not be updated", outcome.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn test_log_matches_habit_name_case_insensitively() {
        let store = MemoryStore::with_demo_data(today());
        let session = Session::local();

        log(&store, &session, dec!(2), "social media", None, today())
            .await
            .unwrap();
        let newest = series::recent(&store.list_logs(&session).await.unwrap(), 1);
        assert_eq!(newest[0].value, dec!(-30));

        let err = log(&store, &session, dec!(1), "Sleeping", None, today())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Available habits"));
    }

    #[tokio::test]
    async fn test_edit_changes_only_given_fields() {
        let store = MemoryStore::with_demo_data(today());
        let session = Session::local();
        let before = store.get_log(&session, 1).await.unwrap();

        edit(
            &store,
            &session,
            1,
            ActivityEdit {
                hours: Some(dec!(3)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let after = store.get_log(&session, 1).await.unwrap();
        assert_eq!(after.hours, dec!(3));
        assert_eq!(after.date, before.date);
        assert_eq!(after.note, before.note);
        assert_eq!(after.value, dec!(150));

        assert!(
            edit(&store, &session, 1, ActivityEdit::default())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_bulk_reports_partial_failure() {
        let store = MemoryStore::with_demo_data(today());
        let session = Session::local();

        let result = bulk(&store, &session, &[1, 2, 999], BulkEdit::Delete).await;
        assert!(result.unwrap_err().to_string().contains("1 activities"));
        assert_eq!(store.list_logs(&session).await.unwrap().len(), 28);

        bulk(&store, &session, &[3], BulkEdit::Category("habit".to_string()))
            .await
            .unwrap();
        assert_eq!(store.get_log(&session, 3).await.unwrap().category_id, 4);
    }

    #[test]
    fn test_entries_table_names_missing_habits() {
        console::set_colors_enabled(false);
        let entry = LogEntry {
            id: 1,
            user_id: "local".to_string(),
            date: today(),
            hours: dec!(1),
            category_id: 42,
            note: Some("gone".to_string()),
            value: dec!(10),
        };
        let table = entries_table(&[entry], &[], "$");
        assert!(table.contains(series::UNKNOWN_CATEGORY));
        assert!(table.contains("$10.00"));
    }
}
