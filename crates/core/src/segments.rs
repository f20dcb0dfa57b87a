//! Audience membership derived from booking history.
//!
//! Nothing here is stored: membership is recomputed from the current
//! bookings and `now` on every read, so moving `now` forward can move a
//! customer between segments.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{AudienceKind, Booking, Customer};
use crate::types::CustomerId;

/// A customer is `Frequent` with more than this many bookings.
pub const FREQUENT_AFTER_BOOKINGS: usize = 2;
/// A customer is `Lapsed` when their last booking is older than this.
pub const LAPSED_AFTER_DAYS: i64 = 60;
/// A single booking this recent makes a customer `New`.
pub const NEW_WITHIN_DAYS: i64 = 30;

/// Booking count and most recent booking start for one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct History {
    pub bookings: usize,
    pub last_booking_at: DateTime<Utc>,
}

/// Summarize non-cancelled bookings per customer.
#[must_use]
pub fn histories(bookings: &[Booking]) -> HashMap<CustomerId, History> {
    let mut map: HashMap<CustomerId, History> = HashMap::new();
    for booking in bookings.iter().filter(|b| b.blocks_time()) {
        map.entry(booking.customer.id)
            .and_modify(|h| {
                h.bookings += 1;
                h.last_booking_at = h.last_booking_at.max(booking.start_at);
            })
            .or_insert(History {
                bookings: 1,
                last_booking_at: booking.start_at,
            });
    }
    map
}

/// Whether a customer with `history` belongs to `kind` at `now`.
#[must_use]
pub fn is_member(kind: AudienceKind, history: Option<&History>, now: DateTime<Utc>) -> bool {
    match (kind, history) {
        (AudienceKind::All, _) => true,
        (_, None) => false,
        (AudienceKind::Frequent, Some(h)) => h.bookings > FREQUENT_AFTER_BOOKINGS,
        (AudienceKind::Lapsed, Some(h)) => {
            now - h.last_booking_at > TimeDelta::days(LAPSED_AFTER_DAYS)
        }
        (AudienceKind::New, Some(h)) => {
            h.bookings == 1 && now - h.last_booking_at <= TimeDelta::days(NEW_WITHIN_DAYS)
        }
    }
}

/// Customers in the `kind` segment.
#[must_use]
pub fn members<'a>(
    kind: AudienceKind,
    customers: &'a [Customer],
    bookings: &[Booking],
    now: DateTime<Utc>,
) -> Vec<&'a Customer> {
    let histories = histories(bookings);
    customers
        .iter()
        .filter(|c| is_member(kind, histories.get(&c.id), now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(bookings: usize, days_ago: i64, now: DateTime<Utc>) -> History {
        History {
            bookings,
            last_booking_at: now - TimeDelta::days(days_ago),
        }
    }

    #[test]
    fn test_all_includes_customers_without_bookings() {
        assert!(is_member(AudienceKind::All, None, Utc::now()));
        assert!(!is_member(AudienceKind::Lapsed, None, Utc::now()));
    }

    #[test]
    fn test_frequent_needs_three() {
        let now = Utc::now();
        assert!(!is_member(AudienceKind::Frequent, Some(&history(2, 1, now)), now));
        assert!(is_member(AudienceKind::Frequent, Some(&history(3, 1, now)), now));
    }

    #[test]
    fn test_lapsed_after_sixty_days() {
        let now = Utc::now();
        assert!(!is_member(AudienceKind::Lapsed, Some(&history(4, 60, now)), now));
        assert!(is_member(AudienceKind::Lapsed, Some(&history(4, 61, now)), now));
    }

    #[test]
    fn test_new_is_single_recent_booking() {
        let now = Utc::now();
        assert!(is_member(AudienceKind::New, Some(&history(1, 10, now)), now));
        assert!(!is_member(AudienceKind::New, Some(&history(1, 31, now)), now));
        assert!(!is_member(AudienceKind::New, Some(&history(2, 1, now)), now));
    }

    #[test]
    fn test_membership_moves_with_now() {
        let now = Utc::now();
        let h = history(1, 5, now);
        assert!(is_member(AudienceKind::New, Some(&h), now));
        let later = now + TimeDelta::days(90);
        assert!(!is_member(AudienceKind::New, Some(&h), later));
        assert!(is_member(AudienceKind::Lapsed, Some(&h), later));
    }
}
