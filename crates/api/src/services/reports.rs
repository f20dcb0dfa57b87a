//! Read-only summaries for the business dashboard and the platform admin.

use chrono::{DateTime, Utc};
use reservio_core::types::{BookingStatus, BusinessId, Email, ReviewStatus};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{Database, RepositoryError, Tenant};

/// Headline numbers of one business.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Non-cancelled bookings starting today (UTC).
    pub today_bookings: usize,
    /// Confirmed bookings starting after now.
    pub upcoming_bookings: usize,
    /// Sum of transaction totals recorded today (UTC).
    pub today_revenue: Decimal,
    pub pending_reviews: usize,
    pub customer_count: usize,
}

/// One business as listed in the admin back-office.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessSummary {
    pub id: BusinessId,
    pub name: String,
    pub owner_email: Email,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
    pub customer_count: usize,
    pub staff_count: usize,
    pub service_count: usize,
    pub booking_count: usize,
    pub transaction_count: usize,
}

impl From<&Tenant> for BusinessSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.business.id,
            name: tenant.business.name.clone(),
            owner_email: tenant.business.owner_email.clone(),
            suspended: tenant.business.suspended,
            created_at: tenant.business.created_at,
            customer_count: tenant.customers.len(),
            staff_count: tenant.staff.len(),
            service_count: tenant.services.len(),
            booking_count: tenant.bookings.len(),
            transaction_count: tenant.transactions.len(),
        }
    }
}

/// Platform-wide totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformStats {
    pub businesses: usize,
    pub suspended_businesses: usize,
    pub accounts: usize,
    pub customers: usize,
    pub bookings: usize,
    pub transactions: usize,
    pub revenue: Decimal,
}

/// Dashboard numbers for `business_id` as of `now`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the business does not exist.
pub async fn dashboard(
    db: &Database,
    business_id: BusinessId,
    now: DateTime<Utc>,
) -> Result<DashboardSummary, RepositoryError> {
    let tables = db.read().await;
    let tenant = tables.tenant(business_id)?;
    let today = now.date_naive();

    Ok(DashboardSummary {
        today_bookings: tenant
            .bookings
            .iter()
            .filter(|b| b.blocks_time() && b.start_at.date_naive() == today)
            .count(),
        upcoming_bookings: tenant
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.start_at > now)
            .count(),
        today_revenue: tenant
            .transactions
            .iter()
            .filter(|t| t.created_at.date_naive() == today)
            .map(|t| t.total)
            .sum(),
        pending_reviews: tenant
            .reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Pending)
            .count(),
        customer_count: tenant.customers.len(),
    })
}

/// Every business with entity counts, newest first.
pub async fn businesses(db: &Database) -> Vec<BusinessSummary> {
    let tables = db.read().await;
    let mut summaries: Vec<BusinessSummary> = tables.tenants().map(BusinessSummary::from).collect();
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    summaries
}

/// Totals across every business.
pub async fn platform_stats(db: &Database) -> PlatformStats {
    let tables = db.read().await;
    let mut stats = PlatformStats {
        accounts: tables.accounts.len(),
        ..PlatformStats::default()
    };
    for tenant in tables.tenants() {
        stats.businesses += 1;
        stats.suspended_businesses += usize::from(tenant.business.suspended);
        stats.customers += tenant.customers.len();
        stats.bookings += tenant.bookings.len();
        stats.transactions += tenant.transactions.len();
        stats.revenue += tenant.transactions.iter().map(|t| t.total).sum::<Decimal>();
    }
    stats
}

/// Suspend or reinstate a business.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the business does not exist.
pub async fn set_suspended(
    db: &Database,
    business_id: BusinessId,
    suspended: bool,
) -> Result<BusinessSummary, RepositoryError> {
    let mut tables = db.write().await;
    let tenant = tables.tenant_mut(business_id)?;
    tenant.business.suspended = suspended;
    tracing::info!(%business_id, suspended, "Business suspension changed");
    Ok(BusinessSummary::from(&*tenant))
}
