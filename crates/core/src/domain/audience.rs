//! Customer audiences for campaign targeting.
//!
//! An audience stores only its kind; membership is derived from booking
//! history on every read (see [`crate::segments`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::AudienceId;

/// Segment rule of an audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceKind {
    /// Every customer.
    All,
    /// More than two bookings.
    Frequent,
    /// Last booking more than 60 days ago.
    Lapsed,
    /// Exactly one booking, within the last 30 days.
    New,
}

/// A named audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    pub id: AudienceId,
    pub name: String,
    pub kind: AudienceKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an audience.
#[derive(Debug, Clone, Deserialize)]
pub struct AudienceDraft {
    pub name: String,
    pub kind: AudienceKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of an audience.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudiencePatch {
    pub name: Option<String>,
    pub kind: Option<AudienceKind>,
    pub description: Option<String>,
}

impl Audience {
    /// Create an audience.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name.
    pub fn create(draft: AudienceDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: AudienceId::new(),
            name: require_text("name", &draft.name)?,
            kind: draft.kind,
            description: optional_text(draft.description),
            created_at: now,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name.
    pub fn apply(&mut self, patch: AudiencePatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = require_text("name", &name)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if patch.description.is_some() {
            self.description = optional_text(patch.description);
        }
        Ok(())
    }
}
