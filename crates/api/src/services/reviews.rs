//! Review submission and moderation.
//!
//! Every change that can affect a published review recomputes the rating
//! summary of the review's service and staff member in the same write.

use chrono::Utc;
use reservio_core::ValidationError;
use reservio_core::domain::Review;
use reservio_core::domain::review::{MAX_RATING, MIN_RATING};
use reservio_core::types::{
    BookingId, BookingStatus, BusinessId, CustomerId, ReviewId, ReviewStatus,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::{Database, RepositoryError, Tenant};

/// A customer's review of one of their bookings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub booking_id: BookingId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Moderator edit of a review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

fn check_rating(rating: u8) -> Result<u8, ValidationError> {
    if Review::is_valid_rating(rating) {
        Ok(rating)
    } else {
        Err(ValidationError::new(
            "rating",
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ))
    }
}

/// Review operations for one business.
pub struct ReviewService<'a> {
    db: &'a Database,
    business_id: BusinessId,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database, business_id: BusinessId) -> Self {
        Self { db, business_id }
    }

    /// Store a pending review for a completed booking of `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the booking does not exist or
    /// belongs to another customer, `Conflict` if it is not completed or
    /// already reviewed, and `Validation` for an out-of-range rating.
    #[instrument(skip(self, submission), fields(business_id = %self.business_id))]
    pub async fn submit(
        &self,
        customer_id: CustomerId,
        submission: ReviewSubmission,
    ) -> Result<Review, RepositoryError> {
        let rating = check_rating(submission.rating)?;
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;

        let booking = tenant
            .bookings
            .get(submission.booking_id)
            .filter(|b| b.customer.id == customer_id)
            .ok_or(RepositoryError::NotFound("booking"))?;
        if booking.status != BookingStatus::Completed {
            return Err(RepositoryError::Conflict(
                "only completed bookings can be reviewed".to_owned(),
            ));
        }
        if tenant.reviews.iter().any(|r| r.booking_id == booking.id) {
            return Err(RepositoryError::Conflict(
                "booking has already been reviewed".to_owned(),
            ));
        }

        let review = Review {
            id: ReviewId::new(),
            booking_id: booking.id,
            service_id: booking.service.id,
            staff_id: booking.staff.id,
            customer_id,
            customer_name: booking.customer.name.clone(),
            rating,
            comment: submission
                .comment
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty()),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
        };
        tenant.reviews.insert(review.clone())?;
        info!(review_id = %review.id, rating, "Review submitted");
        Ok(review)
    }

    /// Moderate or edit a review, then recompute ratings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown review and
    /// `Validation` for an out-of-range rating.
    #[instrument(skip(self, patch), fields(business_id = %self.business_id))]
    pub async fn update(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, RepositoryError> {
        let rating = patch.rating.map(check_rating).transpose()?;
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;

        let review = tenant.reviews.find_mut(id)?;
        if let Some(status) = patch.status {
            review.status = status;
        }
        if let Some(rating) = rating {
            review.rating = rating;
        }
        if let Some(comment) = patch.comment {
            let comment = comment.trim();
            review.comment = (!comment.is_empty()).then(|| comment.to_owned());
        }
        let review = review.clone();

        refresh(tenant, &review);
        info!(review_id = %id, status = ?review.status, "Review updated");
        Ok(review)
    }

    /// Delete a review, then recompute ratings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown review.
    #[instrument(skip(self), fields(business_id = %self.business_id))]
    pub async fn delete(&self, id: ReviewId) -> Result<Review, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        let review = tenant.reviews.remove(id)?;
        refresh(tenant, &review);
        Ok(review)
    }
}

fn refresh(tenant: &mut Tenant, review: &Review) {
    tenant.refresh_ratings(review.service_id, review.staff_id);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]
mod tests {
    use reservio_core::domain::{
        Booking, Business, CustomerSnapshot, Service, ServiceDraft, ServiceSnapshot, Staff,
        StaffDraft, StaffSnapshot,
    };
    use reservio_core::types::{CurrencyCode, Email, PaymentStatus, StaffRole};
    use rust_decimal::Decimal;

    use super::*;

    struct Fixture {
        db: Database,
        business_id: BusinessId,
        customer_id: CustomerId,
        service: Service,
        staff: Staff,
        bookings: Vec<BookingId>,
    }

    async fn fixture(statuses: &[BookingStatus]) -> Fixture {
        let now = Utc::now();
        let business_id = BusinessId::new();
        let customer_id = CustomerId::new();
        let service = Service::create(
            ServiceDraft {
                name: "Massage".to_owned(),
                description: None,
                category: None,
                price: Decimal::from(70),
                currency: CurrencyCode::EUR,
                duration_minutes: 60,
                staff_ids: Vec::new(),
            },
            now,
        )
        .unwrap();
        let staff = Staff::create(
            StaffDraft {
                name: "Lin".to_owned(),
                email: None,
                phone: None,
                role: StaffRole::Therapist,
                schedule: None,
            },
            now,
        )
        .unwrap();

        let db = Database::new();
        let mut bookings = Vec::new();
        {
            let mut tables = db.write().await;
            let tenant = tables
                .insert_tenant(Tenant::new(Business {
                    id: business_id,
                    name: "Spa".to_owned(),
                    owner_email: Email::parse("owner@spa.test").unwrap(),
                    suspended: false,
                    created_at: now,
                }))
                .unwrap();
            tenant.services.insert(service.clone()).unwrap();
            tenant.staff.insert(staff.clone()).unwrap();
            for &status in statuses {
                let booking = Booking {
                    id: BookingId::new(),
                    start_at: now,
                    end_at: now + service.duration(),
                    status,
                    customer: CustomerSnapshot {
                        id: customer_id,
                        name: "Noor".to_owned(),
                        email: None,
                    },
                    service: ServiceSnapshot::from(&service),
                    staff: StaffSnapshot::from(&staff),
                    recurrence_rule: None,
                    recurrence_end_date: None,
                    parent_booking_id: None,
                    payment_status: PaymentStatus::Unpaid,
                    payment_intent_id: None,
                    transaction_id: None,
                    notes: None,
                    review_requested_at: None,
                    created_at: now,
                    updated_at: now,
                };
                bookings.push(booking.id);
                tenant.bookings.insert(booking).unwrap();
            }
        }
        Fixture {
            db,
            business_id,
            customer_id,
            service,
            staff,
            bookings,
        }
    }

    fn submission(booking_id: BookingId, rating: u8) -> ReviewSubmission {
        ReviewSubmission {
            booking_id,
            rating,
            comment: Some("  Lovely  ".to_owned()),
        }
    }

    fn publish() -> ReviewPatch {
        ReviewPatch {
            status: Some(ReviewStatus::Published),
            ..ReviewPatch::default()
        }
    }

    async fn ratings(f: &Fixture) -> ((f64, u32), (f64, u32)) {
        let tables = f.db.read().await;
        let tenant = tables.tenant(f.business_id).unwrap();
        let service = tenant.services.get(f.service.id).unwrap();
        let staff = tenant.staff.get(f.staff.id).unwrap();
        (
            (service.average_rating, service.review_count),
            (staff.average_rating, staff.review_count),
        )
    }

    #[tokio::test]
    async fn test_submit_is_pending_and_unrated() {
        let f = fixture(&[BookingStatus::Completed]).await;
        let svc = ReviewService::new(&f.db, f.business_id);
        let review = svc
            .submit(f.customer_id, submission(f.bookings[0], 5))
            .await
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.comment.as_deref(), Some("Lovely"));
        assert_eq!(ratings(&f).await.0, (0.0, 0));
    }

    #[tokio::test]
    async fn test_submit_rules() {
        let f = fixture(&[BookingStatus::Completed, BookingStatus::Confirmed]).await;
        let svc = ReviewService::new(&f.db, f.business_id);

        assert!(matches!(
            svc.submit(f.customer_id, submission(f.bookings[0], 6)).await,
            Err(RepositoryError::Validation(_))
        ));
        assert!(matches!(
            svc.submit(CustomerId::new(), submission(f.bookings[0], 4)).await,
            Err(RepositoryError::NotFound("booking"))
        ));
        assert!(matches!(
            svc.submit(f.customer_id, submission(f.bookings[1], 4)).await,
            Err(RepositoryError::Conflict(_))
        ));

        svc.submit(f.customer_id, submission(f.bookings[0], 4))
            .await
            .unwrap();
        assert!(matches!(
            svc.submit(f.customer_id, submission(f.bookings[0], 4)).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_publishing_updates_mean_and_count() {
        let f = fixture(&[BookingStatus::Completed; 3]).await;
        let svc = ReviewService::new(&f.db, f.business_id);
        let mut ids = Vec::new();
        for (booking, rating) in f.bookings.iter().zip([5, 4, 2]) {
            let review = svc
                .submit(f.customer_id, submission(*booking, rating))
                .await
                .unwrap();
            ids.push(review.id);
        }

        svc.update(ids[0], publish()).await.unwrap();
        assert_eq!(ratings(&f).await.0, (5.0, 1));

        svc.update(ids[1], publish()).await.unwrap();
        let (service, staff) = ratings(&f).await;
        assert_eq!(service, (4.5, 2));
        assert_eq!(staff, (4.5, 2));

        let reject = ReviewPatch {
            status: Some(ReviewStatus::Rejected),
            ..ReviewPatch::default()
        };
        svc.update(ids[2], reject).await.unwrap();
        assert_eq!(ratings(&f).await.0, (4.5, 2));

        svc.delete(ids[0]).await.unwrap();
        assert_eq!(ratings(&f).await.0, (4.0, 1));
    }
}
