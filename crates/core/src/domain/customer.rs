//! Customers of a business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::{CustomerId, Email};

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDraft {
    pub name: String,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a customer. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl Customer {
    /// Build a new customer from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name is blank.
    pub fn create(draft: CustomerDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: CustomerId::new(),
            name: require_text("name", &draft.name)?,
            email: draft.email,
            phone: optional_text(draft.phone),
            notes: optional_text(draft.notes),
            created_at: now,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the new name is blank; nothing is changed.
    pub fn apply(&mut self, patch: CustomerPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name {
            self.name = require_text("name", &name)?;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.phone.is_some() {
            self.phone = optional_text(patch.phone);
        }
        if patch.notes.is_some() {
            self.notes = optional_text(patch.notes);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(name: &str) -> CustomerDraft {
        CustomerDraft {
            name: name.to_owned(),
            email: None,
            phone: Some("  ".to_owned()),
            notes: None,
        }
    }

    #[test]
    fn test_create_trims_and_drops_blank_phone() {
        let customer = Customer::create(draft("  Ada Lovelace "), Utc::now()).unwrap();
        assert_eq!(customer.name, "Ada Lovelace");
        assert_eq!(customer.phone, None);
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = Customer::create(draft(" "), Utc::now()).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_apply_blank_name_leaves_record_untouched() {
        let mut customer = Customer::create(draft("Ada"), Utc::now()).unwrap();
        let patch = CustomerPatch {
            name: Some(String::new()),
            ..CustomerPatch::default()
        };
        assert!(customer.apply(patch).is_err());
        assert_eq!(customer.name, "Ada");
    }
}
