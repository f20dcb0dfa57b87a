//! Rating aggregation over published reviews.

use serde::{Deserialize, Serialize};

use crate::domain::Review;
use crate::types::{ServiceId, StaffId};

/// Mean rating and count of published reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: u32,
}

/// Summarize the published reviews matched by `filter`.
///
/// An empty set yields `0.0` and `0`.
#[must_use]
pub fn summarize<'a, F>(reviews: impl IntoIterator<Item = &'a Review>, filter: F) -> RatingSummary
where
    F: Fn(&Review) -> bool,
{
    let (sum, count) = reviews
        .into_iter()
        .filter(|r| r.is_published() && filter(r))
        .fold((0_u32, 0_u32), |(sum, count), r| {
            (sum + u32::from(r.rating), count + 1)
        });

    if count == 0 {
        return RatingSummary::default();
    }
    RatingSummary {
        average_rating: f64::from(sum) / f64::from(count),
        review_count: count,
    }
}

/// Published-review summary for a service.
#[must_use]
pub fn for_service(reviews: &[Review], id: ServiceId) -> RatingSummary {
    summarize(reviews, |r| r.service_id == id)
}

/// Published-review summary for a staff member.
#[must_use]
pub fn for_staff(reviews: &[Review], id: StaffId) -> RatingSummary {
    summarize(reviews, |r| r.staff_id == id)
}
