//! Bookable services offered by a business.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::{CurrencyCode, ServiceId, StaffId};

/// A service that customers can book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub duration_minutes: u32,
    /// Staff members who can perform this service.
    #[serde(default)]
    pub staff_ids: Vec<StaffId>,
    /// Mean of published review ratings, `0.0` when there are none.
    #[serde(default)]
    pub average_rating: f64,
    /// Number of published reviews.
    #[serde(default)]
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub duration_minutes: u32,
    #[serde(default)]
    pub staff_ids: Vec<StaffId>,
}

/// Partial update of a service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub duration_minutes: Option<u32>,
    pub staff_ids: Option<Vec<StaffId>>,
}

fn check_price(price: Decimal) -> Result<Decimal, ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price", "cannot be negative"));
    }
    Ok(price)
}

fn check_duration(minutes: u32) -> Result<u32, ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::new(
            "duration_minutes",
            "must be greater than zero",
        ));
    }
    Ok(minutes)
}

impl Service {
    /// Build a new service from a draft.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name, negative price or zero duration.
    pub fn create(draft: ServiceDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ServiceId::new(),
            name: require_text("name", &draft.name)?,
            description: optional_text(draft.description),
            category: optional_text(draft.category),
            price: check_price(draft.price)?,
            currency: draft.currency,
            duration_minutes: check_duration(draft.duration_minutes)?,
            staff_ids: draft.staff_ids,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
        })
    }

    /// Apply a partial update. Validation happens before any field changes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name, negative price or zero duration.
    pub fn apply(&mut self, patch: ServicePatch) -> Result<(), ValidationError> {
        let name = patch.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let price = patch.price.map(check_price).transpose()?;
        let duration = patch.duration_minutes.map(check_duration).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(duration) = duration {
            self.duration_minutes = duration;
        }
        if patch.description.is_some() {
            self.description = optional_text(patch.description);
        }
        if patch.category.is_some() {
            self.category = optional_text(patch.category);
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(staff_ids) = patch.staff_ids {
            self.staff_ids = staff_ids;
        }
        Ok(())
    }

    /// Length of one appointment.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft() -> ServiceDraft {
        ServiceDraft {
            name: "Haircut".to_owned(),
            description: None,
            category: Some("Hair".to_owned()),
            price: Decimal::new(4500, 2),
            currency: CurrencyCode::USD,
            duration_minutes: 30,
            staff_ids: Vec::new(),
        }
    }

    #[test]
    fn test_create_starts_unrated() {
        let service = Service::create(draft(), Utc::now()).unwrap();
        assert_eq!(service.review_count, 0);
        assert_eq!(service.duration(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut d = draft();
        d.duration_minutes = 0;
        assert_eq!(
            Service::create(d, Utc::now()).unwrap_err().field,
            "duration_minutes"
        );
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut service = Service::create(draft(), Utc::now()).unwrap();
        let patch = ServicePatch {
            name: Some("Long cut".to_owned()),
            price: Some(Decimal::new(-1, 0)),
            ..ServicePatch::default()
        };
        assert!(service.apply(patch).is_err());
        assert_eq!(service.name, "Haircut");
    }
}
