//! Tenant businesses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BusinessId, Email};

/// A tenant of the platform. Created by business signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub owner_email: Email,
    /// Suspended businesses keep their data but their users are refused.
    #[serde(default)]
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}
