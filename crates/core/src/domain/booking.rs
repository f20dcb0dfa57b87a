//! Appointments.
//!
//! A booking embeds snapshots of its customer, service and staff member
//! rather than joining on IDs, so historical bookings keep the names and
//! prices that applied when they were made.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Customer, Service, Staff};
use crate::types::{
    BookingId, BookingStatus, CustomerId, Email, PaymentStatus, ServiceId, StaffId,
    TransactionId,
};

/// Repeat cadence of a recurring booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceRule {
    Weekly,
    Monthly,
}

/// Customer fields copied into a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<Email>,
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
        }
    }
}

/// Service fields copied into a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub id: ServiceId,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: u32,
}

impl From<&Service> for ServiceSnapshot {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id,
            name: service.name.clone(),
            price: service.price,
            duration_minutes: service.duration_minutes,
        }
    }
}

/// Staff fields copied into a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSnapshot {
    pub id: StaffId,
    pub name: String,
}

impl From<&Staff> for StaffSnapshot {
    fn from(staff: &Staff) -> Self {
        Self {
            id: staff.id,
            name: staff.name.clone(),
        }
    }
}

/// A scheduled appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub start_at: DateTime<Utc>,
    /// Always `start_at + service.duration_minutes`.
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub status: BookingStatus,
    pub customer: CustomerSnapshot,
    pub service: ServiceSnapshot,
    pub staff: StaffSnapshot,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub recurrence_end_date: Option<NaiveDate>,
    /// Shared by every occurrence of a recurring series.
    pub parent_booking_id: Option<BookingId>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub transaction_id: Option<TransactionId>,
    pub notes: Option<String>,
    /// Set once the customer has been asked to review a completed booking.
    pub review_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether the booking still occupies its staff member's time.
    #[must_use]
    pub fn blocks_time(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// Whether `[start, end)` intersects this booking's `[start_at, end_at)`.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        crate::scheduling::overlaps(self.start_at, self.end_at, start, end)
    }
}

/// Input for creating a booking or a recurring series.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDraft {
    pub customer_id: CustomerId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

/// Partial update of a booking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub start_at: Option<DateTime<Utc>>,
    pub customer_id: Option<CustomerId>,
    pub service_id: Option<ServiceId>,
    pub staff_id: Option<StaffId>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

impl BookingPatch {
    /// Whether the patch touches anything besides status and notes.
    #[must_use]
    pub const fn reschedules(&self) -> bool {
        self.start_at.is_some()
            || self.customer_id.is_some()
            || self.service_id.is_some()
            || self.staff_id.is_some()
    }
}
