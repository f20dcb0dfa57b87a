//! Business logic on top of the repository layer.
//!
//! Services borrow the [`Database`](crate::db::Database) plus whatever
//! scoping they need (usually a business ID) and are constructed per
//! request. Handlers stay thin: parse, call a service, serialize.

pub mod auth;
pub mod bookings;
pub mod events;
pub mod marketing;
pub mod pos;
pub mod reports;
pub mod reviews;
pub mod stripe;

pub use auth::{AuthError, AuthService, Session, TokenPair, TokenStore};
pub use bookings::{Availability, BookingError, BookingFilter, BookingService};
pub use events::{DomainEvent, EventBus};
pub use marketing::{AudienceView, MarketingService};
pub use pos::{CartRequest, PosError, PosService, Quote};
pub use reviews::{ReviewPatch, ReviewService, ReviewSubmission};
pub use stripe::WebhookError;
