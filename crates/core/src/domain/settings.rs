//! Per-business settings.

use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, Email};

/// Business profile and policy switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSettings {
    pub business_name: String,
    pub currency: CurrencyCode,
    /// IANA timezone label shown to users. Times are stored in UTC.
    pub timezone: String,
    pub contact_email: Option<Email>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    /// Reject bookings that overlap another active booking of the same staff member.
    pub prevent_double_booking: bool,
    /// Let POS sales drive stock below zero.
    pub allow_negative_stock: bool,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            business_name: String::new(),
            currency: CurrencyCode::default(),
            timezone: "UTC".to_owned(),
            contact_email: None,
            contact_phone: None,
            address: None,
            prevent_double_booking: false,
            allow_negative_stock: true,
        }
    }
}
