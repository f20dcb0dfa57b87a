//! Seed file checks.
//!
//! Parses a seed, reports what it would create and then applies it to a
//! throwaway store so that validation and double-booking errors surface
//! before the server is started with it.

use std::path::Path;

use chrono::Utc;
use reservio_api::db::seed::{SeedError, SeedFile};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from `seed check`.
#[derive(Debug, Error)]
pub enum SeedCheckError {
    /// The file could not be read, parsed or applied.
    #[error(transparent)]
    Seed(#[from] SeedError),

    /// The file refers to entities it does not define.
    #[error("seed has {0} problem(s)")]
    Problems(usize),
}

/// Check a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed, names unknown entities,
/// or fails to apply.
pub fn check(path: &Path) -> Result<(), SeedCheckError> {
    info!(path = %path.display(), "Loading seed file");
    let seed = SeedFile::load(path)?;

    let report = seed.check();
    info!(
        admins = report.admins,
        businesses = report.businesses,
        staff = report.staff,
        services = report.services,
        customers = report.customers,
        products = report.products,
        bookings = report.bookings,
        "Parsed seed"
    );

    if !report.is_ok() {
        for problem in &report.problems {
            warn!("{problem}");
        }
        return Err(SeedCheckError::Problems(report.problems.len()));
    }

    let tables = seed.into_tables(Utc::now())?;
    info!(tenants = tables.tenants().count(), "Seed applies cleanly");
    Ok(())
}
