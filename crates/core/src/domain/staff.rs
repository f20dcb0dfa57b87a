//! Staff members and their weekly working hours.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::{Email, StaffId, StaffRole};

/// Working hours for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub is_working: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DaySchedule {
    /// A working day from `start` to `end`.
    #[must_use]
    pub const fn working(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            is_working: true,
            start,
            end,
        }
    }

    /// A day off. Times are kept so toggling the day back on restores them.
    #[must_use]
    pub const fn off(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            is_working: false,
            start,
            end,
        }
    }
}

/// A staff member's recurring week.
///
/// Times are wall-clock times in the business timezone; the service treats
/// them as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl Default for WeeklySchedule {
    /// Monday to Friday, 09:00 to 17:00.
    fn default() -> Self {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        let weekday = DaySchedule::working(nine, five);
        let weekend = DaySchedule::off(nine, five);
        Self {
            monday: weekday,
            tuesday: weekday,
            wednesday: weekday,
            thursday: weekday,
            friday: weekday,
            saturday: weekend,
            sunday: weekend,
        }
    }
}

impl WeeklySchedule {
    /// Schedule for a given weekday.
    #[must_use]
    pub const fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Working window on `date`, or `None` on a day off.
    #[must_use]
    pub fn window_on(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        use chrono::Datelike;

        let day = self.day(date.weekday());
        day.is_working.then(|| {
            (
                date.and_time(day.start).and_utc(),
                date.and_time(day.end).and_utc(),
            )
        })
    }

    /// Check that every working day ends after it starts.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first invalid day.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let days = [
            ("schedule.monday", &self.monday),
            ("schedule.tuesday", &self.tuesday),
            ("schedule.wednesday", &self.wednesday),
            ("schedule.thursday", &self.thursday),
            ("schedule.friday", &self.friday),
            ("schedule.saturday", &self.saturday),
            ("schedule.sunday", &self.sunday),
        ];
        for (field, day) in days {
            if day.is_working && day.end <= day.start {
                return Err(ValidationError::new(field, "end must be after start"));
            }
        }
        Ok(())
    }
}

/// A staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default)]
    pub schedule: WeeklySchedule,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a staff member.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffDraft {
    pub name: String,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default)]
    pub schedule: Option<WeeklySchedule>,
}

/// Partial update of a staff member. The schedule has its own endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
}

impl Staff {
    /// Build a staff member from a draft, defaulting to a weekday schedule.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name or an inverted working day.
    pub fn create(draft: StaffDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let schedule = draft.schedule.unwrap_or_default();
        schedule.validate()?;
        Ok(Self {
            id: StaffId::new(),
            name: require_text("name", &draft.name)?,
            email: draft.email,
            phone: optional_text(draft.phone),
            role: draft.role,
            schedule,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the new name is blank.
    pub fn apply(&mut self, patch: StaffPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = require_text("name", &name)?;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.phone.is_some() {
            self.phone = optional_text(patch.phone);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        Ok(())
    }

    /// Replace the weekly schedule.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any working day ends before it starts.
    pub fn set_schedule(&mut self, schedule: WeeklySchedule) -> Result<(), ValidationError> {
        schedule.validate()?;
        self.schedule = schedule;
        Ok(())
    }
}
