//! YAML seed files.
//!
//! A seed describes admins and businesses with their catalog, customers and
//! bookings. Bookings refer to customers, services and staff by name, so a
//! file can be written by hand:
//!
//! ```yaml
//! businesses:
//!   - name: Studio North
//!     owner: { email: owner@north.test, name: Mia, password: "correct horse battery" }
//!     staff:
//!       - name: Grace
//!     services:
//!       - { name: Cut, price: "40.00", duration_minutes: 30, staff: [Grace] }
//!     customers:
//!       - name: Ada
//!     bookings:
//!       - { customer: Ada, service: Cut, staff: Grace, start_at: 2024-01-01T09:00:00Z }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use reservio_core::ValidationError;
use reservio_core::domain::{
    Audience, AudienceDraft, Booking, Business, BusinessSettings, Customer, CustomerDraft,
    CustomerSnapshot, Product, ProductDraft, RecurrenceRule, Service, ServiceDraft,
    ServiceSnapshot, Staff, StaffDraft, StaffSnapshot,
};
use reservio_core::scheduling::{Recurrence, ScheduleError, expand_occurrences};
use reservio_core::types::{
    AccountClass, AccountId, BookingId, BookingStatus, BusinessId, CurrencyCode, Email,
    PaymentStatus, StaffId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::{Account, RepositoryError, Tables, Tenant};
use crate::services::auth::{AuthError, hash_password};

/// Errors loading or applying a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{business}: {source}")]
    Validation {
        business: String,
        source: ValidationError,
    },

    #[error("{business}: {message}")]
    Reference { business: String, message: String },

    #[error("{business}: {source}")]
    Schedule {
        business: String,
        source: ScheduleError,
    },

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("failed to hash seed password: {0}")]
    Password(#[from] AuthError),
}

/// Login credentials for a seeded account.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    pub email: Email,
    pub name: String,
    pub password: String,
}

/// A service whose staff are named rather than referenced by ID.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedService {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub duration_minutes: u32,
    #[serde(default)]
    pub staff: Vec<String>,
}

/// A booking (or recurring series) referring to records by name.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBooking {
    pub customer: String,
    pub service: String,
    pub staff: String,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One tenant in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBusiness {
    pub name: String,
    pub owner: SeedAccount,
    #[serde(default)]
    pub settings: Option<BusinessSettings>,
    #[serde(default)]
    pub staff: Vec<StaffDraft>,
    #[serde(default)]
    pub services: Vec<SeedService>,
    #[serde(default)]
    pub customers: Vec<CustomerDraft>,
    #[serde(default)]
    pub products: Vec<ProductDraft>,
    #[serde(default)]
    pub audiences: Vec<AudienceDraft>,
    #[serde(default)]
    pub bookings: Vec<SeedBooking>,
}

/// Root of a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub admins: Vec<SeedAccount>,
    #[serde(default)]
    pub businesses: Vec<SeedBusiness>,
}

/// Entity counts and problems found by [`SeedFile::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admins: usize,
    pub businesses: usize,
    pub staff: usize,
    pub services: usize,
    pub customers: usize,
    pub products: usize,
    /// Bookings after recurrence expansion.
    pub bookings: usize,
    pub problems: Vec<String>,
}

impl SeedReport {
    /// Whether the seed can be applied.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

impl SeedFile {
    /// Parse a seed from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` for malformed YAML or invalid field values.
    pub fn from_yaml(text: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` or `SeedError::Parse`.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Count entities and collect dangling references without applying anything.
    #[must_use]
    pub fn check(&self) -> SeedReport {
        let mut report = SeedReport {
            admins: self.admins.len(),
            businesses: self.businesses.len(),
            ..SeedReport::default()
        };

        for business in &self.businesses {
            report.staff += business.staff.len();
            report.services += business.services.len();
            report.customers += business.customers.len();
            report.products += business.products.len();

            let staff: HashSet<&str> = business.staff.iter().map(|s| s.name.trim()).collect();
            let services: HashSet<&str> =
                business.services.iter().map(|s| s.name.trim()).collect();
            let customers: HashSet<&str> =
                business.customers.iter().map(|c| c.name.trim()).collect();

            for service in &business.services {
                for name in &service.staff {
                    if !staff.contains(name.trim()) {
                        report.problems.push(format!(
                            "{}: service '{}' names unknown staff '{name}'",
                            business.name, service.name
                        ));
                    }
                }
            }
            for booking in &business.bookings {
                let refs = [
                    ("customer", &booking.customer, &customers),
                    ("service", &booking.service, &services),
                    ("staff", &booking.staff, &staff),
                ];
                for (kind, name, known) in refs {
                    if !known.contains(name.trim()) {
                        report.problems.push(format!(
                            "{}: booking at {} names unknown {kind} '{name}'",
                            business.name, booking.start_at
                        ));
                    }
                }
                match Recurrence::from_parts(booking.recurrence_rule, booking.recurrence_end_date)
                    .and_then(|r| expand_occurrences(booking.start_at, r))
                {
                    Ok(starts) => report.bookings += starts.len(),
                    Err(e) => report.problems.push(format!(
                        "{}: booking at {}: {e}",
                        business.name, booking.start_at
                    )),
                }
            }
        }
        report
    }

    /// Build the initial tables, hashing every seeded password.
    ///
    /// # Errors
    ///
    /// Returns `SeedError` for invalid records, dangling references or
    /// recurrence errors; nothing is returned partially applied.
    pub fn into_tables(self, now: DateTime<Utc>) -> Result<Tables, SeedError> {
        let mut tables = Tables::default();

        for admin in self.admins {
            tables
                .accounts
                .insert(seed_account(AccountClass::Admin, admin, None, now)?)?;
        }

        for business in self.businesses {
            let business_id = BusinessId::new();
            let owner = seed_account(
                AccountClass::Business,
                business.owner.clone(),
                Some(business_id),
                now,
            )?;
            tables.accounts.insert(owner)?;
            let tenant = build_tenant(business_id, business, now)?;
            tables.insert_tenant(tenant)?;
        }
        Ok(tables)
    }
}

fn seed_account(
    class: AccountClass,
    seed: SeedAccount,
    business_id: Option<BusinessId>,
    now: DateTime<Utc>,
) -> Result<Account, SeedError> {
    Ok(Account {
        id: AccountId::new(),
        class,
        email: seed.email,
        name: seed.name,
        password_hash: hash_password(&seed.password)?,
        business_id,
        customer_id: None,
        created_at: now,
    })
}

fn build_tenant(
    id: BusinessId,
    seed: SeedBusiness,
    now: DateTime<Utc>,
) -> Result<Tenant, SeedError> {
    let name = seed.name.clone();
    let invalid = |source: ValidationError| SeedError::Validation {
        business: name.clone(),
        source,
    };
    let dangling = |message: String| SeedError::Reference {
        business: name.clone(),
        message,
    };

    let mut tenant = Tenant::new(Business {
        id,
        name: seed.name.clone(),
        owner_email: seed.owner.email.clone(),
        suspended: false,
        created_at: now,
    });
    if let Some(settings) = seed.settings {
        tenant.settings = settings;
    }

    let mut staff_by_name: HashMap<String, StaffId> = HashMap::new();
    for draft in seed.staff {
        let staff = Staff::create(draft, now).map_err(invalid)?;
        staff_by_name.insert(staff.name.clone(), staff.id);
        tenant.staff.insert(staff)?;
    }

    for seed_service in seed.services {
        let staff_ids = seed_service
            .staff
            .iter()
            .map(|n| {
                staff_by_name
                    .get(n.trim())
                    .copied()
                    .ok_or_else(|| dangling(format!("unknown staff '{n}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let draft = ServiceDraft {
            name: seed_service.name,
            description: seed_service.description,
            category: seed_service.category,
            price: seed_service.price,
            currency: seed_service.currency,
            duration_minutes: seed_service.duration_minutes,
            staff_ids,
        };
        tenant
            .services
            .insert(Service::create(draft, now).map_err(invalid)?)?;
    }

    for draft in seed.customers {
        tenant
            .customers
            .insert(Customer::create(draft, now).map_err(invalid)?)?;
    }
    for draft in seed.products {
        tenant
            .products
            .insert(Product::create(draft, now).map_err(invalid)?)?;
    }
    for draft in seed.audiences {
        tenant
            .audiences
            .insert(Audience::create(draft, now).map_err(invalid)?)?;
    }

    for booking in seed.bookings {
        let customer = tenant
            .customers
            .iter()
            .find(|c| c.name == booking.customer.trim())
            .map(CustomerSnapshot::from)
            .ok_or_else(|| dangling(format!("unknown customer '{}'", booking.customer)))?;
        let service = tenant
            .services
            .iter()
            .find(|s| s.name == booking.service.trim())
            .ok_or_else(|| dangling(format!("unknown service '{}'", booking.service)))?;
        let duration = service.duration();
        let service = ServiceSnapshot::from(service);
        let staff = tenant
            .staff
            .iter()
            .find(|s| s.name == booking.staff.trim())
            .map(StaffSnapshot::from)
            .ok_or_else(|| dangling(format!("unknown staff '{}'", booking.staff)))?;

        let schedule_error = |source| SeedError::Schedule {
            business: name.clone(),
            source,
        };
        let recurrence =
            Recurrence::from_parts(booking.recurrence_rule, booking.recurrence_end_date)
                .map_err(schedule_error)?;
        let starts = expand_occurrences(booking.start_at, recurrence).map_err(schedule_error)?;

        let parent = recurrence.map(|_| BookingId::new());
        for (n, start_at) in starts.into_iter().enumerate() {
            let id = match (n, parent) {
                (0, Some(parent)) => parent,
                _ => BookingId::new(),
            };
            tenant.bookings.insert(Booking {
                id,
                start_at,
                end_at: start_at + duration,
                status: booking.status,
                customer: customer.clone(),
                service: service.clone(),
                staff: staff.clone(),
                recurrence_rule: booking.recurrence_rule,
                recurrence_end_date: recurrence.map(|r| r.until),
                parent_booking_id: parent,
                payment_status: PaymentStatus::Unpaid,
                payment_intent_id: None,
                transaction_id: None,
                notes: booking.notes.clone(),
                review_requested_at: None,
                created_at: now,
                updated_at: now,
            })?;
        }
    }

    Ok(tenant)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SEED: &str = r#"
businesses:
  - name: Studio North
    owner: { email: owner@north.test, name: Mia, password: "tr0ub4dor&3-horse" }
    settings:
      prevent_double_booking: true
    staff:
      - name: Grace
    services:
      - { name: Cut, price: "40.00", duration_minutes: 30, staff: [Grace] }
    customers:
      - name: Ada
    products:
      - { name: Pomade, price: "12.50", stock_quantity: 10 }
    bookings:
      - customer: Ada
        service: Cut
        staff: Grace
        start_at: 2024-01-01T09:00:00Z
        recurrence_rule: weekly
        recurrence_end_date: 2024-01-22
"#;

    #[test]
    fn test_check_counts_expanded_bookings() {
        let seed = SeedFile::from_yaml(SEED).unwrap();
        let report = seed.check();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.businesses, 1);
        assert_eq!(report.services, 1);
        assert_eq!(report.bookings, 4);
    }

    #[test]
    fn test_check_reports_dangling_names() {
        let yaml = SEED.replace("customer: Ada", "customer: Bob");
        let report = SeedFile::from_yaml(&yaml).unwrap().check();
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("unknown customer 'Bob'"));
    }

    #[test]
    fn test_into_tables_links_series() {
        let tables = SeedFile::from_yaml(SEED)
            .unwrap()
            .into_tables(Utc::now())
            .unwrap();
        let tenant = tables.tenants().next().unwrap();
        assert!(tenant.settings.prevent_double_booking);
        assert_eq!(tenant.bookings.len(), 4);

        let first = tenant.bookings.as_slice()[0].clone();
        assert_eq!(first.parent_booking_id, Some(first.id));
        assert!(
            tenant
                .bookings
                .iter()
                .all(|b| b.parent_booking_id == Some(first.id))
        );
        assert_eq!(tables.accounts.len(), 1);
    }
}
