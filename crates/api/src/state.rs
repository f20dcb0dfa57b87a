//! Application state shared across handlers.

use std::sync::Arc;

use reservio_core::types::BusinessId;

use crate::config::ApiConfig;
use crate::db::Database;
use crate::services::events::spawn_worker;
use crate::services::{AuthService, BookingService, EventBus, TokenStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; gives handlers the store, the token caches
/// and the event bus.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Arc<Database>,
    tokens: TokenStore,
    events: EventBus,
}

impl AppState {
    /// Create the state and spawn the domain event worker.
    ///
    /// The worker exits once the last clone of the state is dropped.
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(config: ApiConfig, db: Database) -> Self {
        let db = Arc::new(db);
        let tokens = TokenStore::new(config.access_token_ttl, config.refresh_token_ttl);
        let (events, rx) = EventBus::new();
        spawn_worker(Arc::clone(&db), rx);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                tokens,
                events,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the in-process store.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the bearer token caches.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Authentication service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.db(),
            self.tokens(),
            self.inner.config.admin_signup_code.as_ref(),
        )
    }

    /// Booking service for one business.
    #[must_use]
    pub fn bookings(&self, business_id: BusinessId) -> BookingService<'_> {
        BookingService::new(self.db(), &self.inner.events, business_id)
    }
}
