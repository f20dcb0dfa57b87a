//! Audiences and campaign delivery.

use chrono::{DateTime, Utc};
use reservio_core::domain::{Audience, Campaign, CampaignDraft, CampaignPatch, Customer};
use reservio_core::segments;
use reservio_core::types::{AudienceId, BusinessId, CampaignId, CampaignStatus};
use serde::Serialize;
use tracing::{info, instrument};

use crate::db::{Database, RepositoryError, Tenant};

/// An audience with its current computed size.
#[derive(Debug, Clone, Serialize)]
pub struct AudienceView {
    #[serde(flatten)]
    pub audience: Audience,
    pub customer_count: usize,
}

/// Customers in `audience` as of `now`.
fn audience_members<'t>(
    tenant: &'t Tenant,
    audience: &Audience,
    now: DateTime<Utc>,
) -> Vec<&'t Customer> {
    segments::members(
        audience.kind,
        tenant.customers.as_slice(),
        tenant.bookings.as_slice(),
        now,
    )
}

/// Audience and campaign operations for one business.
pub struct MarketingService<'a> {
    db: &'a Database,
    business_id: BusinessId,
}

impl<'a> MarketingService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database, business_id: BusinessId) -> Self {
        Self { db, business_id }
    }

    /// Every audience with its size.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business does not exist.
    pub async fn audiences(&self, now: DateTime<Utc>) -> Result<Vec<AudienceView>, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        Ok(tenant
            .audiences
            .iter()
            .map(|audience| AudienceView {
                customer_count: audience_members(tenant, audience, now).len(),
                audience: audience.clone(),
            })
            .collect())
    }

    /// One audience with its size.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown audience.
    pub async fn audience(
        &self,
        id: AudienceId,
        now: DateTime<Utc>,
    ) -> Result<AudienceView, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        let audience = tenant.audiences.find(id)?;
        Ok(AudienceView {
            customer_count: audience_members(tenant, audience, now).len(),
            audience: audience.clone(),
        })
    }

    /// Customers currently in an audience.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown audience.
    pub async fn members(
        &self,
        id: AudienceId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        let audience = tenant.audiences.find(id)?;
        Ok(audience_members(tenant, audience, now)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Create a campaign targeting an audience of this business, or everyone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` for an unknown audience and
    /// `RepositoryError::Validation` for a blank name or body.
    pub async fn create_campaign(
        &self,
        draft: CampaignDraft,
        now: DateTime<Utc>,
    ) -> Result<Campaign, RepositoryError> {
        let campaign = Campaign::create(draft, now)?;
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        if let Some(audience_id) = campaign.audience_id {
            tenant.audiences.resolve(audience_id)?;
        }
        tenant.campaigns.insert(campaign.clone())?;
        Ok(campaign)
    }

    /// Edit a campaign that has not been sent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a sent campaign,
    /// `InvalidReference` for an unknown audience and `Validation` for bad
    /// fields.
    pub async fn update_campaign(
        &self,
        id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Campaign, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        if let Some(audience_id) = patch.audience_id {
            tenant.audiences.resolve(audience_id)?;
        }
        let stored = tenant.campaigns.find_mut(id)?;
        if stored.status == CampaignStatus::Sent {
            return Err(RepositoryError::Conflict(
                "a sent campaign cannot be edited".to_owned(),
            ));
        }
        let mut updated = stored.clone();
        updated.apply(patch)?;
        *stored = updated.clone();
        Ok(updated)
    }

    /// Mark a campaign as sent to its audience's current members.
    ///
    /// A campaign without an audience goes to every customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown campaign,
    /// `Conflict` if it was already sent, and `InvalidReference` if its
    /// audience no longer exists.
    #[instrument(skip(self), fields(business_id = %self.business_id))]
    pub async fn send_campaign(
        &self,
        id: CampaignId,
        now: DateTime<Utc>,
    ) -> Result<Campaign, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;

        let campaign = tenant.campaigns.find(id)?;
        if campaign.status == CampaignStatus::Sent {
            return Err(RepositoryError::Conflict(
                "campaign has already been sent".to_owned(),
            ));
        }
        let recipients = match campaign.audience_id {
            Some(audience_id) => {
                let audience = tenant.audiences.resolve(audience_id)?;
                audience_members(tenant, audience, now).len()
            }
            None => tenant.customers.len(),
        };

        let campaign = tenant.campaigns.find_mut(id)?;
        campaign.mark_sent(recipients, now);
        info!(campaign_id = %id, recipients, "Campaign sent");
        Ok(campaign.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeDelta;
    use reservio_core::domain::{
        AudienceDraft, AudienceKind, Booking, Business, CampaignDraft, CustomerDraft,
        CustomerSnapshot, ServiceSnapshot, StaffSnapshot,
    };
    use reservio_core::types::{BookingId, BookingStatus, Email, PaymentStatus, ServiceId, StaffId};
    use rust_decimal::Decimal;

    use super::*;

    fn booking(customer: &Customer, start_at: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            start_at,
            end_at: start_at + TimeDelta::minutes(30),
            status,
            customer: CustomerSnapshot::from(customer),
            service: ServiceSnapshot {
                id: ServiceId::new(),
                name: "Cut".to_owned(),
                price: Decimal::from(30),
                duration_minutes: 30,
            },
            staff: StaffSnapshot {
                id: StaffId::new(),
                name: "Kai".to_owned(),
            },
            recurrence_rule: None,
            recurrence_end_date: None,
            parent_booking_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            transaction_id: None,
            notes: None,
            review_requested_at: None,
            created_at: start_at,
            updated_at: start_at,
        }
    }

    /// Business with a regular (3 bookings), a newcomer (1 recent), a lapsed
    /// customer (1 booking 90 days ago) and a customer who never booked.
    async fn fixture(now: DateTime<Utc>) -> (Database, BusinessId) {
        let business_id = BusinessId::new();
        let db = Database::new();
        let mut tables = db.write().await;
        let tenant = tables
            .insert_tenant(Tenant::new(Business {
                id: business_id,
                name: "Barber".to_owned(),
                owner_email: Email::parse("owner@barber.test").unwrap(),
                suspended: false,
                created_at: now,
            }))
            .unwrap();

        let customers: Vec<Customer> = ["Regular", "Newcomer", "Lapsed", "Browser"]
            .into_iter()
            .map(|name| {
                Customer::create(
                    CustomerDraft {
                        name: name.to_owned(),
                        email: None,
                        phone: None,
                        notes: None,
                    },
                    now,
                )
                .unwrap()
            })
            .collect();
        let day = TimeDelta::days(1);
        let history = [
            booking(&customers[0], now - day * 3, BookingStatus::Completed),
            booking(&customers[0], now - day * 2, BookingStatus::Completed),
            booking(&customers[0], now + day, BookingStatus::Confirmed),
            booking(&customers[1], now - day * 5, BookingStatus::Completed),
            booking(&customers[1], now - day * 4, BookingStatus::Cancelled),
            booking(&customers[2], now - day * 90, BookingStatus::Completed),
        ];
        for customer in customers {
            tenant.customers.insert(customer).unwrap();
        }
        for booking in history {
            tenant.bookings.insert(booking).unwrap();
        }
        drop(tables);
        (db, business_id)
    }

    async fn add_audience(db: &Database, business_id: BusinessId, kind: AudienceKind) -> AudienceId {
        let audience = Audience::create(
            AudienceDraft {
                name: format!("{kind:?}"),
                kind,
                description: None,
            },
            Utc::now(),
        )
        .unwrap();
        let id = audience.id;
        db.write()
            .await
            .tenant_mut(business_id)
            .unwrap()
            .audiences
            .insert(audience)
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_audience_sizes() {
        let now = Utc::now();
        let (db, business_id) = fixture(now).await;
        let marketing = MarketingService::new(&db, business_id);
        for (kind, expected) in [
            (AudienceKind::All, vec!["Regular", "Newcomer", "Lapsed", "Browser"]),
            (AudienceKind::Frequent, vec!["Regular"]),
            (AudienceKind::New, vec!["Newcomer"]),
            (AudienceKind::Lapsed, vec!["Lapsed"]),
        ] {
            let id = add_audience(&db, business_id, kind).await;
            let members = marketing.members(id, now).await.unwrap();
            let names: Vec<&str> = members.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, expected, "{kind:?}");
            assert_eq!(
                marketing.audience(id, now).await.unwrap().customer_count,
                expected.len()
            );
        }
        assert_eq!(marketing.audiences(now).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_send_campaign_once() {
        let now = Utc::now();
        let (db, business_id) = fixture(now).await;
        let audience_id = add_audience(&db, business_id, AudienceKind::Frequent).await;
        let targeted = Campaign::create(
            CampaignDraft {
                name: "Loyalty".to_owned(),
                channel: reservio_core::domain::CampaignChannel::Email,
                subject: None,
                body: "Thanks for coming back".to_owned(),
                audience_id: Some(audience_id),
                scheduled_at: None,
            },
            now,
        )
        .unwrap();
        let mut broadcast = targeted.clone();
        broadcast.id = CampaignId::new();
        broadcast.audience_id = None;
        {
            let mut tables = db.write().await;
            let tenant = tables.tenant_mut(business_id).unwrap();
            tenant.campaigns.insert(targeted.clone()).unwrap();
            tenant.campaigns.insert(broadcast.clone()).unwrap();
        }

        let marketing = MarketingService::new(&db, business_id);
        let sent = marketing.send_campaign(targeted.id, now).await.unwrap();
        assert_eq!(sent.status, CampaignStatus::Sent);
        assert_eq!(sent.recipient_count, Some(1));
        assert_eq!(sent.sent_at, Some(now));
        assert!(matches!(
            marketing.send_campaign(targeted.id, now).await,
            Err(RepositoryError::Conflict(_))
        ));

        let sent = marketing.send_campaign(broadcast.id, now).await.unwrap();
        assert_eq!(sent.recipient_count, Some(4));

        let patch = CampaignPatch {
            name: Some("Renamed".to_owned()),
            ..CampaignPatch::default()
        };
        assert!(matches!(
            marketing.update_campaign(broadcast.id, patch).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_campaign_audience_must_exist() {
        let now = Utc::now();
        let (db, business_id) = fixture(now).await;
        let marketing = MarketingService::new(&db, business_id);
        let draft = CampaignDraft {
            name: "Spring".to_owned(),
            channel: reservio_core::domain::CampaignChannel::Sms,
            subject: None,
            body: "20% off colour".to_owned(),
            audience_id: Some(AudienceId::new()),
            scheduled_at: None,
        };
        assert!(matches!(
            marketing.create_campaign(draft.clone(), now).await,
            Err(RepositoryError::InvalidReference("audience"))
        ));

        let campaign = marketing
            .create_campaign(
                CampaignDraft {
                    audience_id: None,
                    ..draft
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);

        let scheduled = marketing
            .update_campaign(
                campaign.id,
                CampaignPatch {
                    scheduled_at: Some(now + TimeDelta::days(2)),
                    ..CampaignPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(scheduled.status, CampaignStatus::Scheduled);
    }
}
