//! Chart feeds derived from logged activities.
use crate::core::models::{Category, CategoryId, LogEntry};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub cumulative_value: Decimal,
}

/// Running total of value in date order, one point per entry.
pub fn cumulative_value(entries: &[LogEntry]) -> Vec<CumulativePoint> {
    let mut sorted: Vec<&LogEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);

    let mut running = Decimal::ZERO;
    sorted
        .into_iter()
        .map(|e| {
            running = running.saturating_add(e.value);
            CumulativePoint {
                date: e.date,
                cumulative_value: running,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub hours: Decimal,
    pub value: Decimal,
}

/// Summed value and hours per habit, largest value first.
pub fn value_by_category(entries: &[LogEntry], categories: &[Category]) -> Vec<CategoryTotal> {
    let names: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut totals: HashMap<&str, CategoryTotal> = HashMap::new();
    for entry in entries {
        let name = names
            .get(&entry.category_id)
            .copied()
            .unwrap_or(UNKNOWN_CATEGORY);
        let total = totals.entry(name).or_insert_with(|| CategoryTotal {
            name: name.to_string(),
            hours: Decimal::ZERO,
            value: Decimal::ZERO,
        });
        total.hours = total.hours.saturating_add(entry.hours);
        total.value = total.value.saturating_add(entry.value);
    }

    let mut totals: Vec<CategoryTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    totals
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityStats {
    pub count: usize,
    pub average_hours: Decimal,
    pub average_value: Decimal,
}

pub fn activity_stats(entries: &[LogEntry]) -> ActivityStats {
    let count = entries.len();
    if count == 0 {
        return ActivityStats {
            count,
            average_hours: Decimal::ZERO,
            average_value: Decimal::ZERO,
        };
    }
    let n = Decimal::from(count);
    let hours = entries
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.hours));
    let value = entries
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.value));
    ActivityStats {
        count,
        average_hours: hours.checked_div(n).unwrap_or(Decimal::ZERO),
        average_value: value.checked_div(n).unwrap_or(Decimal::ZERO),
    }
}

/// Newest entries first, at most `limit` of them.
pub fn recent(entries: &[LogEntry], limit: usize) -> Vec<LogEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    sorted.truncate(limit);
    sorted
}
