//! Customer reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BookingId, CustomerId, ReviewId, ReviewStatus, ServiceId, StaffId};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// A customer's review of a completed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub booking_id: BookingId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Whether `rating` is within `MIN_RATING..=MAX_RATING`.
    #[must_use]
    pub const fn is_valid_rating(rating: u8) -> bool {
        rating >= MIN_RATING && rating <= MAX_RATING
    }

    /// Whether the review counts toward rating averages.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == ReviewStatus::Published
    }
}
