//! Booking lifecycle: creation with recurrence, rescheduling, status
//! transitions, series deletion and staff availability.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use reservio_core::domain::{
    Booking, BookingDraft, BookingPatch, CustomerSnapshot, ServiceSnapshot, StaffSnapshot,
};
use reservio_core::scheduling::{Recurrence, ScheduleError, Slot, expand_occurrences, free_slots};
use reservio_core::types::{BookingId, BookingStatus, BusinessId, PaymentStatus, StaffId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use super::events::{DomainEvent, EventBus};
use crate::db::{Database, RepositoryError, Tenant};

/// Errors from booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The business forbids overlapping bookings for one staff member.
    #[error("{staff} is already booked at {start_at}")]
    DoubleBooked {
        staff: String,
        start_at: DateTime<Utc>,
    },

    /// The requested status change is not allowed.
    #[error("cannot change booking status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Query parameters of the booking list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    /// Only bookings starting at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only bookings starting before this instant.
    pub to: Option<DateTime<Utc>>,
    pub staff_id: Option<StaffId>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    fn matches(&self, booking: &Booking) -> bool {
        self.from.is_none_or(|from| booking.start_at >= from)
            && self.to.is_none_or(|to| booking.start_at < to)
            && self.staff_id.is_none_or(|id| booking.staff.id == id)
            && self.status.is_none_or(|status| booking.status == status)
    }
}

/// Free time of one staff member on one day.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub is_working: bool,
    pub slots: Vec<Slot>,
}

/// Booking operations for one business.
pub struct BookingService<'a> {
    db: &'a Database,
    events: &'a EventBus,
    business_id: BusinessId,
}

impl<'a> BookingService<'a> {
    /// Create a booking service scoped to `business_id`.
    #[must_use]
    pub const fn new(db: &'a Database, events: &'a EventBus, business_id: BusinessId) -> Self {
        Self {
            db,
            events,
            business_id,
        }
    }

    /// Bookings matching `filter`, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business does not exist.
    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        let mut bookings: Vec<Booking> = tenant
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_at);
        Ok(bookings)
    }

    /// Create one booking, or every occurrence of a recurring series.
    ///
    /// Occurrences of a series share `parent_booking_id`, which is the ID
    /// of the first occurrence. Either all occurrences are stored or none.
    /// A payment intent is attached to the first occurrence only.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Schedule` for an invalid recurrence,
    /// `RepositoryError::InvalidReference` for unknown customer, service or
    /// staff, `RepositoryError::Conflict` when the payment intent already
    /// belongs to a booking, and `BookingError::DoubleBooked` when the
    /// business forbids overlaps and one occurrence collides.
    #[instrument(skip(self, draft), fields(business_id = %self.business_id))]
    pub async fn create(&self, draft: BookingDraft) -> Result<Vec<Booking>, BookingError> {
        let recurrence = Recurrence::from_parts(draft.recurrence_rule, draft.recurrence_end_date)?;
        let starts = expand_occurrences(draft.start_at, recurrence)?;
        let now = Utc::now();

        let mut tables = self.db.write().await;
        // Webhooks search every business by intent, so an intent names one booking
        if let Some(intent) = draft.payment_intent_id.as_deref()
            && tables.tenants().any(|t| {
                t.bookings
                    .iter()
                    .any(|b| b.payment_intent_id.as_deref() == Some(intent))
            })
        {
            return Err(RepositoryError::Conflict(format!(
                "payment intent {intent} is already attached to a booking"
            ))
            .into());
        }
        let tenant = tables.tenant_mut(self.business_id)?;

        let customer = CustomerSnapshot::from(tenant.customers.resolve(draft.customer_id)?);
        let service = tenant.services.resolve(draft.service_id)?;
        let duration = service.duration();
        let service = ServiceSnapshot::from(service);
        let staff = StaffSnapshot::from(tenant.staff.resolve(draft.staff_id)?);

        if tenant.settings.prevent_double_booking {
            for &start in &starts {
                ensure_free(tenant, &staff, start, start + duration, &[])?;
            }
        }

        let notes = draft
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        let parent = recurrence.map(|_| BookingId::new());

        let bookings: Vec<Booking> = starts
            .into_iter()
            .enumerate()
            .map(|(n, start_at)| Booking {
                id: match (n, parent) {
                    (0, Some(parent)) => parent,
                    _ => BookingId::new(),
                },
                start_at,
                end_at: start_at + duration,
                status: BookingStatus::Confirmed,
                customer: customer.clone(),
                service: service.clone(),
                staff: staff.clone(),
                recurrence_rule: recurrence.map(|r| r.rule),
                recurrence_end_date: recurrence.map(|r| r.until),
                parent_booking_id: parent,
                payment_status: if n == 0 && draft.payment_intent_id.is_some() {
                    PaymentStatus::Pending
                } else {
                    PaymentStatus::Unpaid
                },
                payment_intent_id: if n == 0 {
                    draft.payment_intent_id.clone()
                } else {
                    None
                },
                transaction_id: None,
                notes: notes.clone(),
                review_requested_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        for booking in &bookings {
            tenant.bookings.insert(booking.clone())?;
        }
        info!(count = bookings.len(), "Bookings created");
        Ok(bookings)
    }

    /// Apply a partial update.
    ///
    /// Changing the service, staff, customer or start time refreshes the
    /// snapshots and recomputes `end_at`. Moving into `completed` publishes
    /// [`DomainEvent::BookingCompleted`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown booking,
    /// `RepositoryError::InvalidReference` for unknown participants,
    /// `BookingError::InvalidTransition` for a disallowed status change and
    /// `BookingError::DoubleBooked` for a colliding reschedule.
    #[instrument(skip(self, patch), fields(business_id = %self.business_id))]
    pub async fn update(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, BookingError> {
        let reschedules = patch.reschedules();
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        let current = tenant.bookings.find(id)?;
        let mut updated = current.clone();

        if let Some(customer_id) = patch.customer_id {
            updated.customer = CustomerSnapshot::from(tenant.customers.resolve(customer_id)?);
        }
        if let Some(service_id) = patch.service_id {
            updated.service = ServiceSnapshot::from(tenant.services.resolve(service_id)?);
        }
        if let Some(staff_id) = patch.staff_id {
            updated.staff = StaffSnapshot::from(tenant.staff.resolve(staff_id)?);
        }
        if let Some(start_at) = patch.start_at {
            updated.start_at = start_at;
        }
        updated.end_at =
            updated.start_at + TimeDelta::minutes(i64::from(updated.service.duration_minutes));

        let mut completed = false;
        if let Some(next) = patch.status {
            if !current.status.can_transition_to(next) {
                return Err(BookingError::InvalidTransition {
                    from: current.status,
                    to: next,
                });
            }
            completed = next == BookingStatus::Completed && current.status != next;
            updated.status = next;
        }
        if let Some(notes) = patch.notes {
            let notes = notes.trim();
            updated.notes = (!notes.is_empty()).then(|| notes.to_owned());
        }

        if reschedules && updated.blocks_time() && tenant.settings.prevent_double_booking {
            ensure_free(tenant, &updated.staff, updated.start_at, updated.end_at, &[id])?;
        }

        updated.updated_at = Utc::now();
        *tenant.bookings.find_mut(id)? = updated.clone();
        drop(tables);

        if completed {
            self.events.publish(DomainEvent::BookingCompleted {
                business_id: self.business_id,
                booking_id: id,
            });
        }
        Ok(updated)
    }

    /// Delete a booking, or its whole series when `series` is set.
    ///
    /// Returns the number of bookings removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown booking.
    #[instrument(skip(self), fields(business_id = %self.business_id))]
    pub async fn delete(&self, id: BookingId, series: bool) -> Result<usize, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        let parent = tenant.bookings.find(id)?.parent_booking_id;

        let removed = match parent {
            Some(parent) if series => tenant
                .bookings
                .remove_where(|b| b.parent_booking_id == Some(parent)),
            _ => {
                tenant.bookings.remove(id)?;
                1
            }
        };
        info!(removed, "Bookings deleted");
        Ok(removed)
    }

    /// Free slots of a staff member on `date`: working hours minus active
    /// bookings and time off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown staff member.
    pub async fn availability(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> Result<Availability, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        let staff = tenant.staff.find(staff_id)?;

        let Some(window) = staff.schedule.window_on(date) else {
            return Ok(Availability {
                staff_id,
                date,
                is_working: false,
                slots: Vec::new(),
            });
        };

        let booked = tenant
            .bookings
            .iter()
            .filter(|b| b.staff.id == staff_id && b.blocks_time())
            .map(|b| (b.start_at, b.end_at));
        let away = tenant
            .time_off
            .iter()
            .filter(|t| t.staff_id == staff_id)
            .map(|t| (t.start_at, t.end_at));

        Ok(Availability {
            staff_id,
            date,
            is_working: true,
            slots: free_slots(window, booked.chain(away).collect()),
        })
    }
}

fn ensure_free(
    tenant: &Tenant,
    staff: &StaffSnapshot,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore: &[BookingId],
) -> Result<(), BookingError> {
    if tenant.staff_is_booked(staff.id, start, end, ignore) {
        return Err(BookingError::DoubleBooked {
            staff: staff.name.clone(),
            start_at: start,
        });
    }
    Ok(())
}
