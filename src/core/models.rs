//! Domain models: habits, logged activities and per-user settings.

use crate::core::error::{Result, TrackerError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub type CategoryId = i64;
pub type LogId = i64;

/// Upper bound for a single logged activity.
pub const MAX_HOURS: Decimal = dec!(24);

/// Floor applied when bulk adjustments would push an entry to zero or below.
pub const MIN_ADJUSTED_HOURS: Decimal = dec!(0.1);

pub const DEFAULT_SAVINGS_GOAL: Decimal = dec!(100000.00);

pub fn default_goal_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid calendar date")
}

/// A habit with an hourly rate. Negative rates mark time that destroys value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// User supplied fields for creating or replacing a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::invalid("habit name must not be empty"));
        }
        if self.rate.is_zero() {
            return Err(TrackerError::invalid(format!(
                "habit '{}' needs a non-zero hourly rate",
                self.name.trim()
            )));
        }
        Ok(())
    }

    pub(crate) fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            name: self.name.trim().to_string(),
            rate: self.rate,
            description: self.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// A persisted activity. `value` is frozen at write time from the habit's rate back then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogId,
    pub user_id: String,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub category_id: CategoryId,
    #[serde(default)]
    pub note: Option<String>,
    pub value: Decimal,
}

impl LogEntry {
    /// The draft that reproduces this entry, used as the base for edits.
    pub fn to_draft(&self) -> LogDraft {
        LogDraft {
            date: self.date,
            hours: self.hours,
            category_id: self.category_id,
            note: self.note.clone(),
        }
    }
}

/// An activity as entered by the user, before it is priced.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDraft {
    pub date: NaiveDate,
    pub hours: Decimal,
    pub category_id: CategoryId,
    pub note: Option<String>,
}

impl LogDraft {
    pub fn validate(&self) -> Result<()> {
        if self.hours <= Decimal::ZERO {
            return Err(TrackerError::invalid(format!(
                "hours must be positive, got {}",
                self.hours
            )));
        }
        if self.hours > MAX_HOURS {
            return Err(TrackerError::invalid(format!(
                "hours must not exceed {MAX_HOURS}, got {}",
                self.hours
            )));
        }
        Ok(())
    }

    /// Freezes the value of the draft using the habit's current rate.
    pub fn price(self, category: &Category) -> PricedLog {
        PricedLog {
            value: entry_value(self.hours, category.rate),
            date: self.date,
            hours: self.hours,
            category_id: self.category_id,
            note: self.note.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// A draft with its value computed, ready to be written by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLog {
    pub date: NaiveDate,
    pub hours: Decimal,
    pub category_id: CategoryId,
    pub note: Option<String>,
    pub value: Decimal,
}

impl PricedLog {
    pub(crate) fn into_entry(self, id: LogId, user_id: &str) -> LogEntry {
        LogEntry {
            id,
            user_id: user_id.to_string(),
            date: self.date,
            hours: self.hours,
            category_id: self.category_id,
            note: self.note,
            value: self.value,
        }
    }
}

pub fn entry_value(hours: Decimal, rate: Decimal) -> Decimal {
    hours.checked_mul(rate).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Cad];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Cad => "C$",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| {
                let known: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
                TrackerError::invalid(format!(
                    "unsupported currency '{s}', expected one of {}",
                    known.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: String,
    pub savings_goal: Decimal,
    pub currency: Currency,
    pub goal_date: NaiveDate,
}

impl Settings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            savings_goal: DEFAULT_SAVINGS_GOAL,
            currency: Currency::default(),
            goal_date: default_goal_date(),
        }
    }

    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(goal) = update.savings_goal {
            self.savings_goal = goal;
        }
        if let Some(currency) = update.currency {
            self.currency = currency;
        }
        if let Some(goal_date) = update.goal_date {
            self.goal_date = goal_date;
        }
    }
}

/// A partial settings change. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub savings_goal: Option<Decimal>,
    pub currency: Option<Currency>,
    pub goal_date: Option<NaiveDate>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(goal) = self.savings_goal
            && goal <= Decimal::ZERO
        {
            return Err(TrackerError::invalid(format!(
                "savings goal must be positive, got {goal}"
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.savings_goal.is_none() && self.currency.is_none() && self.goal_date.is_none()
    }
}
