//! Booking time arithmetic: recurrence expansion, overlap checks and free slots.
//!
//! All functions are pure; callers supply `now` and the records to compare.

use chrono::{DateTime, Months, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RecurrenceRule;

/// Upper bound on occurrences a single recurring request may create.
pub const MAX_OCCURRENCES: usize = 520;

/// Errors produced while expanding a recurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A recurrence rule was given without an end date.
    #[error("recurrence_end_date is required for recurring bookings")]
    MissingEndDate,
    /// The end date falls before the first occurrence.
    #[error("recurrence_end_date must not be before the first occurrence")]
    EndBeforeStart,
    /// The range would produce more than [`MAX_OCCURRENCES`] bookings.
    #[error("recurrence would create more than {max} bookings")]
    TooManyOccurrences {
        /// The cap that was exceeded.
        max: usize,
    },
    /// Date arithmetic left chrono's representable range.
    #[error("recurrence date is out of range")]
    OutOfRange,
}

/// A recurrence rule with its inclusive end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub rule: RecurrenceRule,
    pub until: NaiveDate,
}

impl Recurrence {
    /// Combine the optional request fields into a recurrence.
    ///
    /// An end date without a rule is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::MissingEndDate` for a rule without an end date.
    pub const fn from_parts(
        rule: Option<RecurrenceRule>,
        until: Option<NaiveDate>,
    ) -> Result<Option<Self>, ScheduleError> {
        match (rule, until) {
            (None, _) => Ok(None),
            (Some(rule), Some(until)) => Ok(Some(Self { rule, until })),
            (Some(_), None) => Err(ScheduleError::MissingEndDate),
        }
    }
}

/// Start of the `n`th occurrence after `start` (`n = 0` is `start` itself).
///
/// Monthly steps are taken from the original start, so a series that begins
/// on the 31st lands on the last day of shorter months and returns to the
/// 31st afterwards.
fn nth_occurrence(
    start: DateTime<Utc>,
    rule: RecurrenceRule,
    n: u32,
) -> Result<DateTime<Utc>, ScheduleError> {
    match rule {
        RecurrenceRule::Weekly => TimeDelta::try_weeks(i64::from(n))
            .and_then(|step| start.checked_add_signed(step))
            .ok_or(ScheduleError::OutOfRange),
        RecurrenceRule::Monthly => start
            .checked_add_months(Months::new(n))
            .ok_or(ScheduleError::OutOfRange),
    }
}

/// Start times of every booking a request creates.
///
/// Without a recurrence this is just `[start]`. With one, occurrences advance
/// by one week or one calendar month until the occurrence's date passes
/// `until`; an occurrence that falls on `until` is included.
///
/// # Errors
///
/// Returns `ScheduleError` if `until` precedes `start`'s date or the range
/// exceeds [`MAX_OCCURRENCES`].
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use reservio_core::domain::RecurrenceRule;
/// use reservio_core::scheduling::{Recurrence, expand_occurrences};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
/// let until = NaiveDate::from_ymd_opt(2024, 1, 22).unwrap();
/// let starts = expand_occurrences(
///     start,
///     Some(Recurrence { rule: RecurrenceRule::Weekly, until }),
/// )
/// .unwrap();
/// assert_eq!(starts.len(), 4);
/// ```
pub fn expand_occurrences(
    start: DateTime<Utc>,
    recurrence: Option<Recurrence>,
) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    let Some(recurrence) = recurrence else {
        return Ok(vec![start]);
    };
    if recurrence.until < start.date_naive() {
        return Err(ScheduleError::EndBeforeStart);
    }

    let mut starts = Vec::new();
    for n in 0.. {
        let occurrence = nth_occurrence(start, recurrence.rule, n)?;
        if occurrence.date_naive() > recurrence.until {
            break;
        }
        if starts.len() == MAX_OCCURRENCES {
            return Err(ScheduleError::TooManyOccurrences {
                max: MAX_OCCURRENCES,
            });
        }
        starts.push(occurrence);
    }
    Ok(starts)
}

/// Whether the half-open intervals `[a_start, a_end)` and `[b_start, b_end)` intersect.
#[must_use]
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A free interval in a staff member's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Subtract `busy` intervals from a working window.
///
/// `busy` may be unsorted, overlap each other, or extend past the window.
#[must_use]
pub fn free_slots(
    window: (DateTime<Utc>, DateTime<Utc>),
    mut busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<Slot> {
    let (window_start, window_end) = window;
    busy.sort_by_key(|(start, _)| *start);

    let mut slots = Vec::new();
    let mut cursor = window_start;
    for (start, end) in busy {
        if end <= cursor || start >= window_end {
            continue;
        }
        if start > cursor {
            slots.push(Slot {
                start_at: cursor,
                end_at: start,
            });
        }
        cursor = cursor.max(end);
        if cursor >= window_end {
            break;
        }
    }
    if cursor < window_end {
        slots.push(Slot {
            start_at: cursor,
            end_at: window_end,
        });
    }
    slots
}
