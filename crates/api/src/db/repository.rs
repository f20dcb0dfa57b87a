//! Typed CRUD over one tenant's table.

use std::marker::PhantomData;

use reservio_core::ValidationError;
use reservio_core::domain::{
    Audience, Booking, Campaign, Customer, Product, Review, Service, Staff, TimeOff, Transaction,
};
use reservio_core::types::BusinessId;

use super::{Database, RepositoryError, TenantRecord};

/// Repository for one record type of one business.
pub struct Repository<'a, T> {
    db: &'a Database,
    business_id: BusinessId,
    _record: PhantomData<T>,
}

pub type CustomerRepository<'a> = Repository<'a, Customer>;
pub type ServiceRepository<'a> = Repository<'a, Service>;
pub type StaffRepository<'a> = Repository<'a, Staff>;
pub type TimeOffRepository<'a> = Repository<'a, TimeOff>;
pub type BookingRepository<'a> = Repository<'a, Booking>;
pub type ProductRepository<'a> = Repository<'a, Product>;
pub type TransactionRepository<'a> = Repository<'a, Transaction>;
pub type ReviewRepository<'a> = Repository<'a, Review>;
pub type CampaignRepository<'a> = Repository<'a, Campaign>;
pub type AudienceRepository<'a> = Repository<'a, Audience>;

impl<'a, T: TenantRecord> Repository<'a, T> {
    /// Create a repository scoped to `business_id`.
    #[must_use]
    pub const fn new(db: &'a Database, business_id: BusinessId) -> Self {
        Self {
            db,
            business_id,
            _record: PhantomData,
        }
    }

    /// All records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business does not exist.
    pub async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        Ok(T::table(tenant).iter().cloned().collect())
    }

    /// Records matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business does not exist.
    pub async fn filter<F>(&self, predicate: F) -> Result<Vec<T>, RepositoryError>
    where
        F: Fn(&T) -> bool,
    {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        Ok(T::table(tenant)
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business or record does not exist.
    pub async fn get(&self, id: T::Id) -> Result<T, RepositoryError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        T::table(tenant).find(id).cloned()
    }

    /// Store a new record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ID is already taken.
    pub async fn insert(&self, record: T) -> Result<T, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        T::table_mut(tenant).insert(record.clone())?;
        Ok(record)
    }

    /// Modify a record in place.
    ///
    /// `change` runs on a copy; the stored record is replaced only if it
    /// succeeds, so a failed validation leaves nothing half-applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown record, or
    /// `RepositoryError::Validation` if `change` rejects the update.
    pub async fn update<F>(&self, id: T::Id, change: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut T) -> Result<(), ValidationError>,
    {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        let stored = T::table_mut(tenant).find_mut(id)?;
        let mut updated = stored.clone();
        change(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the business or record does not exist.
    pub async fn delete(&self, id: T::Id) -> Result<T, RepositoryError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;
        T::table_mut(tenant).remove(id)
    }
}
