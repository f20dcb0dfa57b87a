//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (read or create `x-request-id`)
//! 4. Rate limiting on signup and login only (governor)
//!
//! Authentication is not a layer: handlers take one of the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AdminAuth, BusinessActor, BusinessAuth, CurrentSession, CustomerAuth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
