//! Insertion-ordered record tables.

use std::fmt::Display;

use super::{RepositoryError, Tenant};

/// A stored record with a typed ID.
pub trait Record: Clone + Send + Sync + 'static {
    /// ID newtype of the record.
    type Id: Copy + Eq + Display + Send + Sync;

    /// Entity name used in error messages (`"booking"`, `"customer"`, ...).
    const ENTITY: &'static str;

    /// The record's ID.
    fn id(&self) -> Self::Id;
}

/// A record owned by a tenant, reachable from its [`Tenant`].
pub trait TenantRecord: Record {
    /// The tenant's table of this record type.
    fn table(tenant: &Tenant) -> &Table<Self>;

    /// The tenant's table of this record type, mutably.
    fn table_mut(tenant: &mut Tenant) -> &mut Table<Self>;
}

/// Records of one type, kept in insertion order.
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Record> Table<T> {
    /// Find a record by ID.
    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.rows.iter().find(|r| r.id() == id)
    }

    /// Find a record by ID for modification.
    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.rows.iter_mut().find(|r| r.id() == id)
    }

    /// Find a record by ID or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no record has this ID.
    pub fn find(&self, id: T::Id) -> Result<&T, RepositoryError> {
        self.get(id).ok_or(RepositoryError::NotFound(T::ENTITY))
    }

    /// Find a record by ID for modification or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no record has this ID.
    pub fn find_mut(&mut self, id: T::Id) -> Result<&mut T, RepositoryError> {
        self.get_mut(id).ok_or(RepositoryError::NotFound(T::ENTITY))
    }

    /// Find a record referenced from another entity's input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if no record has this ID.
    pub fn resolve(&self, id: T::Id) -> Result<&T, RepositoryError> {
        self.get(id).ok_or(RepositoryError::InvalidReference(T::ENTITY))
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ID is already taken.
    pub fn insert(&mut self, record: T) -> Result<(), RepositoryError> {
        let id = record.id();
        if self.get(id).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "{} {id} already exists",
                T::ENTITY
            )));
        }
        self.rows.push(record);
        Ok(())
    }

    /// Remove and return a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no record has this ID.
    pub fn remove(&mut self, id: T::Id) -> Result<T, RepositoryError> {
        let index = self
            .rows
            .iter()
            .position(|r| r.id() == id)
            .ok_or(RepositoryError::NotFound(T::ENTITY))?;
        Ok(self.rows.remove(index))
    }

    /// Remove every record matching `predicate`, returning how many went.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|r| !predicate(r));
        before - self.rows.len()
    }
}

impl<T> Table<T> {
    /// Iterate over all records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    /// Iterate mutably over all records in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.rows.iter_mut()
    }

    /// All records as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
