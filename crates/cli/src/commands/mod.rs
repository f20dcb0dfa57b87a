//! CLI command implementations.

pub mod quote;
pub mod recurrence;
pub mod seed;
pub mod stripe;
