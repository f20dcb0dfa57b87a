//! In-process storage for every tenant.
//!
//! # Layout
//!
//! [`Database`] wraps a single [`Tables`] value behind a `tokio::sync::RwLock`:
//!
//! - `tenants` - one [`Tenant`] per business, holding all of its records
//! - `accounts` - authentication records for every user class
//!
//! Typed CRUD goes through [`Repository`] (aliased per entity, e.g.
//! [`CustomerRepository`]). Operations that touch several records at once
//! (booking series, POS commits, rating recomputation) take one write guard
//! and work on the [`Tenant`] directly so they are applied atomically.

pub mod accounts;
pub mod repository;
pub mod seed;
pub mod table;
pub mod tenant;

use std::collections::HashMap;

use reservio_core::ValidationError;
use reservio_core::types::BusinessId;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use accounts::{Account, AccountView, ApiKey, ApiKeyView};
pub use repository::{
    AudienceRepository, BookingRepository, CampaignRepository, CustomerRepository,
    ProductRepository, Repository, ReviewRepository, ServiceRepository, StaffRepository,
    TimeOffRepository, TransactionRepository,
};
pub use table::{Record, Table, TenantRecord};
pub use tenant::Tenant;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Requested entity was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Constraint violation (e.g. duplicate email, terminal status).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A request referenced an ID that does not exist in the tenant.
    #[error("invalid {0} ID")]
    InvalidReference(&'static str),

    /// A record failed domain validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Everything the service stores.
#[derive(Debug, Default)]
pub struct Tables {
    tenants: HashMap<BusinessId, Tenant>,
    pub accounts: Table<Account>,
}

impl Tables {
    /// Look up a tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown business.
    pub fn tenant(&self, id: BusinessId) -> Result<&Tenant, RepositoryError> {
        self.tenants
            .get(&id)
            .ok_or(RepositoryError::NotFound("business"))
    }

    /// Look up a tenant for modification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown business.
    pub fn tenant_mut(&mut self, id: BusinessId) -> Result<&mut Tenant, RepositoryError> {
        self.tenants
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("business"))
    }

    /// Register a new tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the business already exists.
    pub fn insert_tenant(&mut self, tenant: Tenant) -> Result<&mut Tenant, RepositoryError> {
        let id = tenant.business.id;
        if self.tenants.contains_key(&id) {
            return Err(RepositoryError::Conflict(format!(
                "business {id} already exists"
            )));
        }
        Ok(self.tenants.entry(id).or_insert(tenant))
    }

    /// All tenants, in no particular order.
    pub fn tenants(&self) -> impl Iterator<Item = &Tenant> {
        self.tenants.values()
    }

    /// All tenants for modification, in no particular order.
    pub fn tenants_mut(&mut self) -> impl Iterator<Item = &mut Tenant> {
        self.tenants.values_mut()
    }
}

/// Shared handle to the in-process store.
#[derive(Debug, Default)]
pub struct Database {
    tables: RwLock<Tables>,
}

impl Database {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database pre-filled with `tables` (e.g. from a seed file).
    #[must_use]
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Acquire a shared read guard.
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    /// Acquire the exclusive write guard.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
