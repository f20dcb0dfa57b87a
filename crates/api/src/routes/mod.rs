//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness
//! GET  /health/ready                     - Readiness (store reachable)
//!
//! # Auth ({class} = business | customer | admin)
//! POST /api/auth/{class}/signup          - Create account, returns tokens (rate limited)
//! POST /api/auth/{class}/login           - Password login (rate limited)
//! POST /api/auth/refresh                 - Rotate token pair
//! POST /api/auth/logout                  - Revoke tokens
//! GET  /api/auth/me                      - Current session
//!
//! # Back-office (business token or X-Api-Key)
//! /api/customers, /api/services, /api/staff, /api/products,
//! /api/campaigns, /api/audiences          - CRUD
//! /api/staff/{id}/schedule                - PUT weekly schedule
//! /api/staff/{id}/availability?date=      - Free slots on a day
//! /api/staff/{id}/time-off[/{id}]         - Time off CRUD
//! /api/bookings                           - List (filters), create, update, delete (?series=true)
//! /api/products/import                    - Bulk import
//! /api/transactions[/quote]               - POS commit and quote
//! /api/reviews                            - Moderation
//! /api/campaigns/{id}/send                - Send campaign
//! /api/audiences/{id}/members             - Audience members
//! /api/settings, /api/api-keys            - Business settings, API keys
//! GET  /api/dashboard                     - Summary numbers
//!
//! # Customer portal
//! GET  /api/portal/bookings
//! POST /api/portal/reviews
//!
//! # Admin
//! GET  /api/admin/businesses
//! POST /api/admin/businesses/{id}/suspend
//! POST /api/admin/businesses/{id}/unsuspend
//! GET  /api/admin/stats
//!
//! # Webhooks
//! POST /api/webhooks/stripe
//! ```

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod customers;
pub mod dashboard;
pub mod marketing;
pub mod portal;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod staff;
pub mod transactions;
pub mod webhooks;

use std::time::Duration;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::config::ApiConfig;
use crate::state::AppState;

/// Every route under `/api`.
pub fn api_routes(config: &ApiConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(config.trust_proxy_headers))
        .nest("/customers", customers::router())
        .nest("/services", catalog::router())
        .nest("/staff", staff::router())
        .nest("/bookings", bookings::router())
        .nest("/products", products::router())
        .nest("/transactions", transactions::router())
        .nest("/reviews", reviews::router())
        .nest("/campaigns", marketing::campaign_router())
        .nest("/audiences", marketing::audience_router())
        .merge(settings::router())
        .route("/dashboard", get(dashboard::show))
        .nest("/portal", portal::router())
        .nest("/admin", admin::router())
        .nest("/webhooks", webhooks::router())
}

/// All routes, including health checks.
pub fn routes(config: &ApiConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(config))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store cannot be read within a second.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match tokio::time::timeout(Duration::from_secs(1), state.db().read()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
