//! Marketing campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::{AudienceId, CampaignId, CampaignStatus};

/// Delivery channel of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignChannel {
    #[default]
    Email,
    Sms,
}

/// A marketing message targeted at an audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub channel: CampaignChannel,
    pub subject: Option<String>,
    pub body: String,
    pub audience_id: Option<AudienceId>,
    #[serde(default)]
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Audience size at the moment of sending.
    pub recipient_count: Option<usize>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    #[serde(default)]
    pub channel: CampaignChannel,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub audience_id: Option<AudienceId>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Partial update of an unsent campaign.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub channel: Option<CampaignChannel>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub audience_id: Option<AudienceId>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Create a draft campaign, or a scheduled one when `scheduled_at` is set.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name or body.
    pub fn create(draft: CampaignDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let status = if draft.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        Ok(Self {
            id: CampaignId::new(),
            name: require_text("name", &draft.name)?,
            channel: draft.channel,
            subject: optional_text(draft.subject),
            body: require_text("body", &draft.body)?,
            audience_id: draft.audience_id,
            status,
            scheduled_at: draft.scheduled_at,
            sent_at: None,
            recipient_count: None,
            created_at: now,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name or body.
    pub fn apply(&mut self, patch: CampaignPatch) -> Result<(), ValidationError> {
        let name = patch.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let body = patch.body.as_deref().map(|b| require_text("body", b)).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(body) = body {
            self.body = body;
        }
        if let Some(channel) = patch.channel {
            self.channel = channel;
        }
        if patch.subject.is_some() {
            self.subject = optional_text(patch.subject);
        }
        if patch.audience_id.is_some() {
            self.audience_id = patch.audience_id;
        }
        if let Some(at) = patch.scheduled_at {
            self.scheduled_at = Some(at);
            self.status = CampaignStatus::Scheduled;
        }
        Ok(())
    }

    /// Mark the campaign as sent to `recipients` customers.
    pub fn mark_sent(&mut self, recipients: usize, now: DateTime<Utc>) {
        self.status = CampaignStatus::Sent;
        self.sent_at = Some(now);
        self.recipient_count = Some(recipients);
    }
}
