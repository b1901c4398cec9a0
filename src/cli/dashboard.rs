use super::ui;
use crate::core::models::{Category, LogEntry, Settings};
use crate::core::series::{self, CategoryTotal, CumulativePoint};
use crate::core::store::{Session, TrackerStore};
use crate::core::valuation::{DerivedMetrics, GoalStatus, Pace};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::debug;

/// Points shown in the cumulative value table.
const CUMULATIVE_POINTS: usize = 10;
const PROGRESS_WIDTH: usize = 40;

/// Everything the dashboard needs, fetched in one go.
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub logs: Vec<LogEntry>,
    pub settings: Settings,
}

pub async fn fetch_snapshot(store: &dyn TrackerStore, session: &Session) -> Result<Snapshot> {
    let pb = ui::new_spinner("Fetching activities...");
    let fetched = futures::try_join!(
        store.list_categories(),
        store.list_logs(session),
        store.get_settings(session),
    );
    pb.finish_and_clear();

    let (categories, logs, settings) = fetched.context("Failed to load dashboard data")?;
    debug!(
        categories = categories.len(),
        logs = logs.len(),
        "Fetched dashboard snapshot"
    );
    Ok(Snapshot {
        categories,
        logs,
        settings,
    })
}

/// Shows the dashboard. A `goal_date` overrides the saved one for this view only.
pub async fn run(
    store: &dyn TrackerStore,
    session: &Session,
    today: NaiveDate,
    goal_date: Option<NaiveDate>,
) -> Result<()> {
    let mut snapshot = fetch_snapshot(store, session).await?;
    if let Some(goal_date) = goal_date
        && let Some(note) = try_goal_date(&mut snapshot, goal_date)
    {
        println!("{}\n", ui::style_text(&note, ui::StyleType::Subtle));
    }
    println!("{}", render(&snapshot, today));
    Ok(())
}

/// Swaps in a hypothetical goal date without touching the store. Returns a note naming
/// the saved date, or `None` when the dates are the same.
pub fn try_goal_date(snapshot: &mut Snapshot, goal_date: NaiveDate) -> Option<String> {
    let saved = std::mem::replace(&mut snapshot.settings.goal_date, goal_date);
    (saved != goal_date).then(|| {
        format!(
            "Projecting against {goal_date} instead of your saved goal date {saved}. \
             Keep it with `hourpot settings set --goal-date {goal_date}`."
        )
    })
}

pub fn render(snapshot: &Snapshot, today: NaiveDate) -> String {
    let settings = &snapshot.settings;
    let symbol = settings.currency.symbol();
    let metrics = DerivedMetrics::compute(
        &snapshot.logs,
        settings.savings_goal,
        settings.goal_date,
        today,
    );

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Habit Value Dashboard", ui::StyleType::Title)
    );

    if snapshot.logs.is_empty() {
        output.push_str(&ui::style_text(
            "No activities logged yet. Start with `hourpot log --hours 1 --category Work`.",
            ui::StyleType::Subtle,
        ));
        output.push_str("\n\n");
    }

    output.push_str(&overview_table(&metrics, symbol).to_string());
    output.push_str("\n\n");
    output.push_str(&ui::style_text("Goal Timeline", ui::StyleType::TotalLabel));
    output.push('\n');
    output.push_str(&timeline_table(&metrics, symbol).to_string());
    output.push_str("\n\n");

    output.push_str(&format!(
        "Progress to {}: {} {}\n",
        ui::format_money(metrics.goal, symbol),
        ui::progress_line(metrics.progress_fraction, PROGRESS_WIDTH),
        ui::format_percent(metrics.progress_percent),
    ));
    output.push_str(&motivation(&metrics, symbol));
    output.push('\n');

    if !snapshot.logs.is_empty() {
        let totals = series::value_by_category(&snapshot.logs, &snapshot.categories);
        output.push('\n');
        output.push_str(&ui::style_text("Value by Habit", ui::StyleType::TotalLabel));
        output.push('\n');
        output.push_str(&category_table(&totals, symbol).to_string());

        let points = series::cumulative_value(&snapshot.logs);
        output.push_str("\n\n");
        output.push_str(&ui::style_text("Cumulative Value", ui::StyleType::TotalLabel));
        output.push('\n');
        output.push_str(&cumulative_table(&points, symbol).to_string());

        let stats = series::activity_stats(&snapshot.logs);
        output.push_str(&format!(
            "\n\n{} activities, {} and {} on average",
            stats.count,
            ui::format_hours(stats.average_hours),
            ui::format_money(stats.average_value, symbol),
        ));
    }

    output
}

fn overview_table(metrics: &DerivedMetrics, symbol: &str) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Total Value"),
        ui::header_cell("Hours Logged"),
        ui::header_cell("Average Rate"),
        ui::header_cell("Daily Average"),
        ui::header_cell("Days Tracked"),
    ]);
    table.add_row(vec![
        ui::value_cell(metrics.total_value, symbol),
        ui::number_cell(ui::format_hours(metrics.total_hours)),
        ui::number_cell(format!("{}/h", ui::format_money(metrics.average_rate, symbol))),
        ui::value_cell(metrics.current_daily_average, symbol),
        ui::number_cell(metrics.data_span_days.to_string()),
    ]);
    table
}

fn timeline_table(metrics: &DerivedMetrics, symbol: &str) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

    let days_left = if metrics.goal_date_passed() {
        format!("{} (target date passed)", metrics.days_remaining)
    } else {
        metrics.days_remaining.to_string()
    };
    let rows = vec![
        ("Savings goal", ui::number_cell(ui::format_money(metrics.goal, symbol))),
        (
            "Remaining",
            ui::number_cell(ui::format_money(metrics.remaining_amount, symbol)),
        ),
        ("Target date", ui::number_cell(metrics.goal_date.to_string())),
        ("Days remaining", ui::number_cell(days_left)),
        (
            "Needed per day",
            ui::number_cell(ui::format_money(metrics.daily_target, symbol)),
        ),
        (
            "Needed per week",
            ui::number_cell(ui::format_money(metrics.weekly_target, symbol)),
        ),
        (
            "Needed per month",
            ui::number_cell(ui::format_money(metrics.monthly_target, symbol)),
        ),
        (
            "Projected completion",
            ui::format_optional_cell(metrics.projected_completion, |d| d.to_string()),
        ),
        (
            "Pace",
            ui::format_optional_cell(metrics.pace(), |pace| match pace {
                Pace::Accelerate(factor) => format!("{:.1}x faster needed", factor.round_dp(1)),
                Pace::Ahead(factor) => format!("{:.1}x ahead", factor.round_dp(1)),
                Pace::NoRequirement => "no pace requirement".to_string(),
            }),
        ),
    ];
    for (label, cell) in rows {
        table.add_row(vec![Cell::new(label), cell]);
    }
    table
}

/// One-line verdict under the progress bar.
pub fn motivation(metrics: &DerivedMetrics, symbol: &str) -> String {
    let message = match metrics.status() {
        GoalStatus::Reached => {
            return ui::style_text(
                &format!(
                    "Goal reached! You are {} past your target.",
                    ui::format_money(metrics.remaining_amount.abs(), symbol)
                ),
                ui::StyleType::TotalValue,
            );
        }
        GoalStatus::OnTrack if metrics.goal_date_passed() => {
            return ui::style_text(
                "The target date has passed. Pick a new goal date with `hourpot settings set --goal-date`.",
                ui::StyleType::Warning,
            );
        }
        GoalStatus::OnTrack => match metrics.ahead_of_target() {
            Some(true) => format!(
                "On track: at this pace you reach your goal on {}.",
                metrics
                    .projected_completion
                    .map_or_else(String::new, |d| d.to_string())
            ),
            _ => "On track for your target date. Keep it up!".to_string(),
        },
        GoalStatus::Behind { shortfall } => {
            return ui::style_text(
                &format!(
                    "Behind: earn {} more per day to hit {} by {}.",
                    ui::format_money(shortfall, symbol),
                    ui::format_money(metrics.goal, symbol),
                    metrics.goal_date
                ),
                ui::StyleType::Warning,
            );
        }
        GoalStatus::NotStarted => {
            return ui::style_text(
                "No value earned yet. Log time on a value-generating habit to get started.",
                ui::StyleType::Subtle,
            );
        }
    };
    ui::style_text(&message, ui::StyleType::TotalValue)
}

fn category_table(totals: &[CategoryTotal], symbol: &str) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Habit"),
        ui::header_cell("Hours"),
        ui::header_cell("Value"),
    ]);
    for total in totals {
        table.add_row(vec![
            Cell::new(&total.name),
            ui::number_cell(ui::format_hours(total.hours)),
            ui::value_cell(total.value, symbol),
        ]);
    }
    table
}

/// The running total at the end of each day, last few days only.
fn cumulative_table(points: &[CumulativePoint], symbol: &str) -> comfy_table::Table {
    let mut per_day: Vec<(NaiveDate, Decimal)> = Vec::new();
    for point in points {
        match per_day.last_mut() {
            Some((date, value)) if *date == point.date => *value = point.cumulative_value,
            _ => per_day.push((point.date, point.cumulative_value)),
        }
    }
    let skip = per_day.len().saturating_sub(CUMULATIVE_POINTS);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Cumulative Value")]);
    for (date, value) in per_day.into_iter().skip(skip) {
        table.add_row(vec![Cell::new(date.to_string()), ui::value_cell(value, symbol)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Currency, LogDraft};
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn metrics(total: Decimal, goal: Decimal, today: NaiveDate) -> DerivedMetrics {
        let entries = if total.is_zero() {
            vec![]
        } else {
            vec![LogEntry {
                id: 1,
                user_id: "u".to_string(),
                date: today,
                hours: dec!(1),
                category_id: 1,
                note: None,
                value: total,
            }]
        };
        DerivedMetrics::compute(&entries, goal, date(2024, 12, 31), today)
    }

    #[test]
    fn test_motivation_follows_goal_status() {
        console::set_colors_enabled(false);
        let today = date(2024, 12, 1);

        assert!(motivation(&metrics(dec!(1000), dec!(1000), today), "$").starts_with("Goal reached"));
        assert!(motivation(&metrics(dec!(1), dec!(1000), today), "$").starts_with("Behind"));
        assert!(motivation(&metrics(dec!(900), dec!(1000), today), "$").starts_with("On track"));
        assert!(motivation(&metrics(dec!(0), dec!(1000), today), "$").starts_with("No value"));
        assert!(
            motivation(&metrics(dec!(5), dec!(1000), date(2025, 1, 5)), "$")
                .contains("target date has passed")
        );
    }

    #[tokio::test]
    async fn test_goal_date_override_is_not_saved() {
        console::set_colors_enabled(false);
        let today = date(2024, 3, 15);
        let store = MemoryStore::with_demo_data(today);
        let session = Session::local();
        let saved = store.get_settings(&session).await.unwrap().goal_date;

        let mut snapshot = fetch_snapshot(&store, &session).await.unwrap();
        let what_if = date(2024, 4, 14);
        let note = try_goal_date(&mut snapshot, what_if).unwrap();
        assert!(note.contains(&saved.to_string()));

        let metrics = DerivedMetrics::compute(
            &snapshot.logs,
            snapshot.settings.savings_goal,
            snapshot.settings.goal_date,
            today,
        );
        assert_eq!(metrics.days_remaining, 30);
        assert!(render(&snapshot, today).contains("2024-04-14"));
        assert!(try_goal_date(&mut snapshot, what_if).is_none());

        run(&store, &session, today, Some(what_if)).await.unwrap();
        assert_eq!(store.get_settings(&session).await.unwrap().goal_date, saved);
    }

    #[tokio::test]
    async fn test_render_demo_snapshot() {
        console::set_colors_enabled(false);
        let today = date(2024, 3, 15);
        let store = MemoryStore::with_demo_data(today);
        let session = Session::local();
        crate::core::tracker::Tracker::new(&store, &session)
            .log_activity(LogDraft {
                date: today,
                hours: dec!(1),
                category_id: 1,
                note: None,
            })
            .await
            .unwrap();
        store
            .upsert_settings(
                &session,
                crate::core::models::SettingsUpdate {
                    currency: Some(Currency::Eur),
                    goal_date: Some(date(2024, 12, 31)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let snapshot = fetch_snapshot(&store, &session).await.unwrap();
        assert_eq!(snapshot.logs.len(), 31);
        let output = render(&snapshot, today);
        assert!(output.contains("Habit Value Dashboard"));
        assert!(output.contains("€100,000.00"));
        assert!(output.contains("Value by Habit"));
        assert!(output.contains("Social Media"));
        assert!(output.contains("31 activities"));
    }

    #[tokio::test]
    async fn test_render_empty_store() {
        console::set_colors_enabled(false);
        let store = MemoryStore::new();
        let snapshot = fetch_snapshot(&store, &Session::local()).await.unwrap();
        let output = render(&snapshot, date(2024, 1, 1));
        assert!(output.contains("No activities logged yet"));
        assert!(!output.contains("Value by Habit"));
    }
}
