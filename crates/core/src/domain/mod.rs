//! Domain records owned by a tenant business.
//!
//! Each record comes with a `*Draft` (create input) and, where records are
//! editable, a `*Patch` (partial update input). Drafts and patches validate
//! themselves; repositories never store an unvalidated record.

pub mod audience;
pub mod booking;
pub mod business;
pub mod campaign;
pub mod customer;
pub mod product;
pub mod review;
pub mod service;
pub mod settings;
pub mod staff;
pub mod time_off;
pub mod transaction;

pub use audience::{Audience, AudienceDraft, AudienceKind, AudiencePatch};
pub use booking::{
    Booking, BookingDraft, BookingPatch, CustomerSnapshot, RecurrenceRule, ServiceSnapshot,
    StaffSnapshot,
};
pub use business::Business;
pub use campaign::{Campaign, CampaignChannel, CampaignDraft, CampaignPatch};
pub use customer::{Customer, CustomerDraft, CustomerPatch};
pub use product::{MAX_STOCK_QUANTITY, Product, ProductDraft, ProductPatch, Variant, VariantDraft};
pub use review::Review;
pub use service::{Service, ServiceDraft, ServicePatch};
pub use settings::BusinessSettings;
pub use staff::{DaySchedule, Staff, StaffDraft, StaffPatch, WeeklySchedule};
pub use time_off::{TimeOff, TimeOffDraft};
pub use transaction::{Discount, LineItem, LineItemKind, PaymentMethod, Transaction};

/// A field of a draft or patch failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field as it appears in the JSON payload.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trim `value` and reject it when nothing is left.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "cannot be empty"));
    }
    Ok(trimmed.to_owned())
}

/// Trim optional free text, mapping blank strings to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
