//! Reservio Core - Domain types and booking/POS logic.
//!
//! This crate provides the types and rules shared by every Reservio component:
//! - `api` - HTTP back-office, customer portal and admin service
//! - `cli` - Command-line tools for seeds, quotes and webhook testing
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! clocks, no storage. Callers pass `now` and the records to operate on.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money and status enums
//! - [`domain`] - Records with their create/update inputs and validation
//! - [`scheduling`] - Recurrence expansion, overlap checks, free slots
//! - [`pricing`] - POS cart totals with discount and tax
//! - [`segments`] - Audience membership from booking history
//! - [`ratings`] - Review aggregation
//! - [`inventory`] - Stock movements on products and variants

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod domain;
pub mod inventory;
pub mod pricing;
pub mod ratings;
pub mod scheduling;
pub mod segments;
pub mod types;

pub use domain::ValidationError;
pub use types::*;
