//! Preview the occurrences of a recurring booking.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::ValueEnum;
use reservio_core::domain::RecurrenceRule;
use reservio_core::scheduling::{Recurrence, ScheduleError, expand_occurrences};
use tracing::info;

/// Recurrence rule as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleArg {
    Weekly,
    Monthly,
}

impl From<RuleArg> for RecurrenceRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Weekly => Self::Weekly,
            RuleArg::Monthly => Self::Monthly,
        }
    }
}

/// `(start, end)` of every booking the series would create.
///
/// # Errors
///
/// Returns `ScheduleError` if `until` precedes `start` or the series is too long.
pub fn occurrences(
    start: DateTime<Utc>,
    duration_minutes: u32,
    rule: RuleArg,
    until: NaiveDate,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, ScheduleError> {
    let duration = TimeDelta::minutes(i64::from(duration_minutes));
    let recurrence = Recurrence {
        rule: rule.into(),
        until,
    };
    Ok(expand_occurrences(start, Some(recurrence))?
        .into_iter()
        .map(|at| (at, at + duration))
        .collect())
}

/// Log each occurrence of the series.
///
/// # Errors
///
/// Returns `ScheduleError` if the series cannot be expanded.
pub fn run(
    start: DateTime<Utc>,
    duration_minutes: u32,
    rule: RuleArg,
    until: NaiveDate,
) -> Result<(), ScheduleError> {
    let series = occurrences(start, duration_minutes, rule, until)?;
    for (n, (start_at, end_at)) in series.iter().enumerate() {
        info!(occurrence = n + 1, %start_at, %end_at);
    }
    info!(count = series.len(), "Series expanded");
    Ok(())
}
