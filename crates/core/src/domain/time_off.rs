//! Staff time off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text};
use crate::types::{StaffId, TimeOffId};

/// A period in which a staff member is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOff {
    pub id: TimeOffId,
    pub staff_id: StaffId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a time-off entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeOffDraft {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TimeOffDraft {
    fn check(&self) -> Result<(), ValidationError> {
        if self.end_at <= self.start_at {
            return Err(ValidationError::new("end_at", "must be after start_at"));
        }
        Ok(())
    }
}

impl TimeOff {
    /// Create a time-off entry for `staff_id`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the period is empty or inverted.
    pub fn create(
        staff_id: StaffId,
        draft: TimeOffDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        draft.check()?;
        Ok(Self {
            id: TimeOffId::new(),
            staff_id,
            start_at: draft.start_at,
            end_at: draft.end_at,
            reason: optional_text(draft.reason),
            created_at: now,
        })
    }

    /// Replace the period and reason.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the period is empty or inverted.
    pub fn replace(&mut self, draft: TimeOffDraft) -> Result<(), ValidationError> {
        draft.check()?;
        self.start_at = draft.start_at;
        self.end_at = draft.end_at;
        self.reason = optional_text(draft.reason);
        Ok(())
    }
}
