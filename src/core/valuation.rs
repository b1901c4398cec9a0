//! Turns a snapshot of logged activities and a savings goal into dashboard metrics.
//!
//! Every function here is pure and total: empty input and zero denominators map to a
//! defined fallback (zero or `None`) instead of an error, so callers can render the
//! results directly. "Today" is always passed in.
use crate::core::models::LogEntry;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

const DAYS_PER_WEEK: Decimal = dec!(7);
/// Months are a flat 30 days here, not calendar months.
const DAYS_PER_MONTH: Decimal = dec!(30);

pub fn total_value(entries: &[LogEntry]) -> Decimal {
    entries
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.value))
}

pub fn total_hours(entries: &[LogEntry]) -> Decimal {
    entries
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.hours))
}

/// Value earned per logged hour, or zero when nothing has been logged.
pub fn average_rate(entries: &[LogEntry]) -> Decimal {
    ratio_or_zero(total_value(entries), total_hours(entries))
}

pub fn progress_percent(total_value: Decimal, goal: Decimal) -> Decimal {
    if goal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ratio_or_zero(total_value.saturating_mul(Decimal::ONE_HUNDRED), goal)
}

/// Share of the goal reached, clamped to `0..=1` for progress bars.
pub fn progress_fraction(total_value: Decimal, goal: Decimal) -> Decimal {
    if goal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ratio_or_zero(total_value, goal).clamp(Decimal::ZERO, Decimal::ONE)
}

/// Inclusive number of calendar days covered by the entries. Never less than one.
pub fn data_span_days(entries: &[LogEntry]) -> i64 {
    let first = entries.iter().map(|e| e.date).min();
    let last = entries.iter().map(|e| e.date).max();
    match (first, last) {
        (Some(first), Some(last)) => ((last - first).num_days() + 1).max(1),
        _ => 1,
    }
}

pub fn current_daily_average(entries: &[LogEntry]) -> Decimal {
    let span = data_span_days(entries).max(1);
    ratio_or_zero(total_value(entries), Decimal::from(span))
}

/// Amount still missing to reach the goal. Negative once the goal is exceeded.
pub fn remaining_amount(total_value: Decimal, goal: Decimal) -> Decimal {
    goal.saturating_sub(total_value)
}

pub fn days_remaining(goal_date: NaiveDate, today: NaiveDate) -> i64 {
    (goal_date - today).num_days()
}

/// Daily earnings needed to close the gap by the goal date; zero once the date is reached.
pub fn required_daily_target(remaining_amount: Decimal, days_remaining: i64) -> Decimal {
    if days_remaining <= 0 {
        return Decimal::ZERO;
    }
    ratio_or_zero(remaining_amount, Decimal::from(days_remaining))
}

pub fn required_weekly_target(daily_target: Decimal) -> Decimal {
    daily_target.saturating_mul(DAYS_PER_WEEK)
}

pub fn required_monthly_target(daily_target: Decimal) -> Decimal {
    daily_target.saturating_mul(DAYS_PER_MONTH)
}

/// Date the goal is reached if the current pace holds. `None` when there is no pace
/// to extrapolate from or the result falls outside the calendar.
pub fn projected_completion_date(
    remaining_amount: Decimal,
    current_daily_average: Decimal,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if current_daily_average <= Decimal::ZERO {
        return None;
    }
    let days = remaining_amount
        .checked_div(current_daily_average)?
        .floor()
        .to_i64()?;
    if days >= 0 {
        today.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// How many times the current pace must be multiplied to meet the daily target.
pub fn pace_ratio(required_daily: Decimal, current_daily_average: Decimal) -> Option<Decimal> {
    if current_daily_average <= Decimal::ZERO {
        return None;
    }
    required_daily.checked_div(current_daily_average)
}

fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Pace ratio as it is shown to the user: always a factor of at least one, framed by direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pace {
    /// Current pace must grow by this factor.
    Accelerate(Decimal),
    /// Current pace exceeds the requirement by this factor.
    Ahead(Decimal),
    /// Nothing left to earn in the target window.
    NoRequirement,
}

impl Pace {
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio > Decimal::ONE {
            Pace::Accelerate(ratio)
        } else if ratio > Decimal::ZERO {
            Pace::Ahead(ratio_or_zero(Decimal::ONE, ratio))
        } else {
            Pace::NoRequirement
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalStatus {
    Reached,
    OnTrack,
    Behind { shortfall: Decimal },
    NotStarted,
}

impl GoalStatus {
    pub fn assess(remaining: Decimal, daily_target: Decimal, current_daily: Decimal) -> Self {
        if remaining <= Decimal::ZERO {
            GoalStatus::Reached
        } else if current_daily >= daily_target {
            GoalStatus::OnTrack
        } else if current_daily > Decimal::ZERO {
            GoalStatus::Behind {
                shortfall: daily_target.saturating_sub(current_daily),
            }
        } else {
            GoalStatus::NotStarted
        }
    }
}

/// Everything the dashboard shows, computed from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub total_value: Decimal,
    pub total_hours: Decimal,
    pub average_rate: Decimal,
    pub progress_percent: Decimal,
    pub progress_fraction: Decimal,
    pub data_span_days: i64,
    pub current_daily_average: Decimal,
    pub remaining_amount: Decimal,
    pub goal: Decimal,
    pub goal_date: NaiveDate,
    pub days_remaining: i64,
    pub daily_target: Decimal,
    pub weekly_target: Decimal,
    pub monthly_target: Decimal,
    pub projected_completion: Option<NaiveDate>,
    pub pace_ratio: Option<Decimal>,
}

impl DerivedMetrics {
    pub fn compute(
        entries: &[LogEntry],
        goal: Decimal,
        goal_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        let total = total_value(entries);
        let current_daily = current_daily_average(entries);
        let remaining = remaining_amount(total, goal);
        let days_left = days_remaining(goal_date, today);
        let daily_target = required_daily_target(remaining, days_left);

        DerivedMetrics {
            total_value: total,
            total_hours: total_hours(entries),
            average_rate: average_rate(entries),
            progress_percent: progress_percent(total, goal),
            progress_fraction: progress_fraction(total, goal),
            data_span_days: data_span_days(entries),
            current_daily_average: current_daily,
            remaining_amount: remaining,
            goal,
            goal_date,
            days_remaining: days_left,
            daily_target,
            weekly_target: required_weekly_target(daily_target),
            monthly_target: required_monthly_target(daily_target),
            projected_completion: projected_completion_date(remaining, current_daily, today),
            pace_ratio: pace_ratio(daily_target, current_daily),
        }
    }

    pub fn pace(&self) -> Option<Pace> {
        self.pace_ratio.map(Pace::from_ratio)
    }

    pub fn status(&self) -> GoalStatus {
        GoalStatus::assess(
            self.remaining_amount,
            self.daily_target,
            self.current_daily_average,
        )
    }

    pub fn goal_date_passed(&self) -> bool {
        self.days_remaining <= 0
    }

    /// `Some(true)` when the projection lands before the target date.
    pub fn ahead_of_target(&self) -> Option<bool> {
        self.projected_completion
            .map(|projected| projected < self.goal_date)
    }
}
