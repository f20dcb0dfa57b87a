//! Opaque bearer tokens backed by TTL caches.
//!
//! Access tokens map to a [`Session`] snapshot of the account; refresh
//! tokens map to the account ID only, so a refresh always re-reads the
//! account. Both expire through moka's time-to-live.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use moka::future::Cache;
use rand::RngCore;
use reservio_core::types::{AccountClass, AccountId, BusinessId, CustomerId, Email};
use serde::Serialize;

use crate::db::{Account, AccountView};

/// Upper bound on live tokens of each kind.
const MAX_TOKENS: u64 = 100_000;

/// Random bytes per token before encoding.
const TOKEN_BYTES: usize = 32;

/// Who an access token belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub account_id: AccountId,
    pub class: AccountClass,
    pub email: Email,
    pub name: String,
    pub business_id: Option<BusinessId>,
    pub customer_id: Option<CustomerId>,
}

impl From<&Account> for Session {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            class: account.class,
            email: account.email.clone(),
            name: account.name.clone(),
            business_id: account.business_id,
            customer_id: account.customer_id,
        }
    }
}

/// Response body of signup, login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub account: AccountView,
}

/// Live access and refresh tokens.
#[derive(Clone)]
pub struct TokenStore {
    access: Cache<String, Session>,
    refresh: Cache<String, AccountId>,
    access_ttl: Duration,
}

impl TokenStore {
    /// Create a store with the given token lifetimes.
    #[must_use]
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access: Cache::builder()
                .max_capacity(MAX_TOKENS)
                .time_to_live(access_ttl)
                .build(),
            refresh: Cache::builder()
                .max_capacity(MAX_TOKENS)
                .time_to_live(refresh_ttl)
                .build(),
            access_ttl,
        }
    }

    /// Issue a fresh access/refresh pair for `account`.
    pub async fn issue(&self, account: &Account) -> TokenPair {
        let access_token = generate_token();
        let refresh_token = generate_token();
        self.access
            .insert(access_token.clone(), Session::from(account))
            .await;
        self.refresh.insert(refresh_token.clone(), account.id).await;

        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
            account: AccountView::from(account),
        }
    }

    /// The session behind a live access token.
    pub async fn session(&self, access_token: &str) -> Option<Session> {
        self.access.get(access_token).await
    }

    /// Consume a refresh token, returning its account.
    ///
    /// The token is removed even when the caller goes on to reject the
    /// refresh, so each refresh token works at most once.
    pub async fn take_refresh(&self, refresh_token: &str) -> Option<AccountId> {
        self.refresh.remove(refresh_token).await
    }

    /// Invalidate an access token.
    pub async fn revoke_access(&self, access_token: &str) {
        self.access.invalidate(access_token).await;
    }
}

/// A URL-safe random token.
fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
