//! Per-business record set.

use chrono::{DateTime, Utc};
use reservio_core::domain::{
    Audience, Booking, Business, BusinessSettings, Campaign, Customer, Product, Review, Service,
    Staff, TimeOff, Transaction,
};
use reservio_core::ratings;
use reservio_core::types::{
    AudienceId, BookingId, CampaignId, CustomerId, ProductId, ReviewId, ServiceId, StaffId,
    TimeOffId, TransactionId,
};

use super::{ApiKey, Record, Table, TenantRecord};

/// All records owned by one business.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub business: Business,
    pub settings: BusinessSettings,
    pub customers: Table<Customer>,
    pub services: Table<Service>,
    pub staff: Table<Staff>,
    pub time_off: Table<TimeOff>,
    pub bookings: Table<Booking>,
    pub products: Table<Product>,
    pub transactions: Table<Transaction>,
    pub reviews: Table<Review>,
    pub campaigns: Table<Campaign>,
    pub audiences: Table<Audience>,
    pub api_keys: Table<ApiKey>,
}

impl Tenant {
    /// An empty tenant whose settings carry the business name.
    #[must_use]
    pub fn new(business: Business) -> Self {
        let settings = BusinessSettings {
            business_name: business.name.clone(),
            ..BusinessSettings::default()
        };
        Self {
            business,
            settings,
            customers: Table::default(),
            services: Table::default(),
            staff: Table::default(),
            time_off: Table::default(),
            bookings: Table::default(),
            products: Table::default(),
            transactions: Table::default(),
            reviews: Table::default(),
            campaigns: Table::default(),
            audiences: Table::default(),
            api_keys: Table::default(),
        }
    }

    /// Whether any non-cancelled booking of `staff_id` intersects `[start, end)`.
    ///
    /// Bookings listed in `ignore` are skipped (a booking being rescheduled
    /// never conflicts with itself).
    #[must_use]
    pub fn staff_is_booked(
        &self,
        staff_id: StaffId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ignore: &[BookingId],
    ) -> bool {
        self.bookings.iter().any(|b| {
            b.staff.id == staff_id
                && b.blocks_time()
                && !ignore.contains(&b.id)
                && b.overlaps(start, end)
        })
    }

    /// Recompute the rating summary of a service and a staff member from
    /// the tenant's published reviews.
    pub fn refresh_ratings(&mut self, service_id: ServiceId, staff_id: StaffId) {
        let reviews = self.reviews.as_slice();
        let service_summary = ratings::for_service(reviews, service_id);
        let staff_summary = ratings::for_staff(reviews, staff_id);

        if let Some(service) = self.services.get_mut(service_id) {
            service.average_rating = service_summary.average_rating;
            service.review_count = service_summary.review_count;
        }
        if let Some(staff) = self.staff.get_mut(staff_id) {
            staff.average_rating = staff_summary.average_rating;
            staff.review_count = staff_summary.review_count;
        }
    }
}

/// Wire a core record type to its tenant table.
macro_rules! tenant_record {
    ($ty:ty, $id:ty, $entity:literal, $field:ident) => {
        impl Record for $ty {
            type Id = $id;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> $id {
                self.id
            }
        }

        impl TenantRecord for $ty {
            fn table(tenant: &Tenant) -> &Table<Self> {
                &tenant.$field
            }

            fn table_mut(tenant: &mut Tenant) -> &mut Table<Self> {
                &mut tenant.$field
            }
        }
    };
}

tenant_record!(Customer, CustomerId, "customer", customers);
tenant_record!(Service, ServiceId, "service", services);
tenant_record!(Staff, StaffId, "staff", staff);
tenant_record!(TimeOff, TimeOffId, "time off", time_off);
tenant_record!(Booking, BookingId, "booking", bookings);
tenant_record!(Product, ProductId, "product", products);
tenant_record!(Transaction, TransactionId, "transaction", transactions);
tenant_record!(Review, ReviewId, "review", reviews);
tenant_record!(Campaign, CampaignId, "campaign", campaigns);
tenant_record!(Audience, AudienceId, "audience", audiences);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use reservio_core::domain::{
        CustomerDraft, CustomerSnapshot, ServiceDraft, ServiceSnapshot, StaffDraft,
        StaffSnapshot,
    };
    use reservio_core::types::{
        BookingStatus, BusinessId, CurrencyCode, Email, PaymentStatus, ReviewStatus,
    };
    use rust_decimal::Decimal;

    use super::*;

    struct Fixture {
        tenant: Tenant,
        customer: Customer,
        service: Service,
        staff: Staff,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let mut tenant = Tenant::new(Business {
            id: BusinessId::new(),
            name: "Studio".to_owned(),
            owner_email: Email::parse("owner@studio.test").unwrap(),
            suspended: false,
            created_at: now,
        });
        let customer = Customer::create(
            CustomerDraft {
                name: "Ada".to_owned(),
                email: None,
                phone: None,
                notes: None,
            },
            now,
        )
        .unwrap();
        let staff = Staff::create(
            StaffDraft {
                name: "Grace".to_owned(),
                email: None,
                phone: None,
                role: reservio_core::types::StaffRole::Stylist,
                schedule: None,
            },
            now,
        )
        .unwrap();
        let service = Service::create(
            ServiceDraft {
                name: "Cut".to_owned(),
                description: None,
                category: None,
                price: Decimal::from(40),
                currency: CurrencyCode::USD,
                duration_minutes: 30,
                staff_ids: vec![staff.id],
            },
            now,
        )
        .unwrap();
        tenant.customers.insert(customer.clone()).unwrap();
        tenant.staff.insert(staff.clone()).unwrap();
        tenant.services.insert(service.clone()).unwrap();
        Fixture {
            tenant,
            customer,
            service,
            staff,
        }
    }

    fn booking(f: &Fixture, start: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            start_at: start,
            end_at: start + f.service.duration(),
            status,
            customer: CustomerSnapshot::from(&f.customer),
            service: ServiceSnapshot::from(&f.service),
            staff: StaffSnapshot::from(&f.staff),
            recurrence_rule: None,
            recurrence_end_date: None,
            parent_booking_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            transaction_id: None,
            notes: None,
            review_requested_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    fn review(f: &Fixture, rating: u8, status: ReviewStatus) -> Review {
        Review {
            id: ReviewId::new(),
            booking_id: BookingId::new(),
            service_id: f.service.id,
            staff_id: f.staff.id,
            customer_id: f.customer.id,
            customer_name: f.customer.name.clone(),
            rating,
            comment: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_staff_is_booked_ignores_cancelled_and_self() {
        let mut f = fixture();
        let nine = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let active = booking(&f, nine, BookingStatus::Confirmed);
        let cancelled = booking(&f, nine + TimeDelta::hours(2), BookingStatus::Cancelled);
        let active_id = active.id;
        f.tenant.bookings.insert(active).unwrap();
        f.tenant.bookings.insert(cancelled).unwrap();

        let staff_id = f.staff.id;
        let half_past = nine + TimeDelta::minutes(15);
        assert!(f.tenant.staff_is_booked(staff_id, half_past, half_past + TimeDelta::minutes(30), &[]));
        assert!(!f.tenant.staff_is_booked(
            staff_id,
            half_past,
            half_past + TimeDelta::minutes(30),
            &[active_id]
        ));
        let eleven = nine + TimeDelta::hours(2);
        assert!(!f.tenant.staff_is_booked(staff_id, eleven, eleven + TimeDelta::minutes(30), &[]));
        assert!(!f.tenant.staff_is_booked(
            staff_id,
            nine + TimeDelta::minutes(30),
            nine + TimeDelta::minutes(60),
            &[]
        ));
    }

    #[test]
    fn test_refresh_ratings_counts_only_published() {
        let mut f = fixture();
        let reviews = [
            review(&f, 5, ReviewStatus::Published),
            review(&f, 4, ReviewStatus::Published),
            review(&f, 1, ReviewStatus::Pending),
            review(&f, 1, ReviewStatus::Rejected),
        ];
        for r in reviews {
            f.tenant.reviews.insert(r).unwrap();
        }
        f.tenant.refresh_ratings(f.service.id, f.staff.id);

        let service = f.tenant.services.get(f.service.id).unwrap();
        assert_eq!(service.review_count, 2);
        assert!((service.average_rating - 4.5).abs() < f64::EPSILON);
        let staff = f.tenant.staff.get(f.staff.id).unwrap();
        assert_eq!(staff.review_count, 2);
        assert!((staff.average_rating - 4.5).abs() < f64::EPSILON);
    }
}
