//! Integration tests for Reservio.
//!
//! Each test spawns the full router on an ephemeral local port with an
//! empty in-memory store and talks to it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p reservio-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Signup, login, token rotation and API keys
//! - `bookings` - Recurrence, double booking and status changes
//! - `pos` - Quotes, commits, stock and the dashboard
//! - `reviews` - Portal submissions, moderation and ratings
//! - `marketing` - Audiences and campaigns
//! - `webhooks` - Signed Stripe deliveries
//! - `admin` - Platform admin and suspension
//! - `rate_limit` - Auth endpoint throttling

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use reservio_api::config::ApiConfig;
use reservio_api::db::Database;
use reservio_api::state::AppState;
use rust_decimal::Decimal;
use serde_json::{Value, json};

/// Password used by every account the helpers create.
pub const PASSWORD: &str = "correct horse battery";

/// A running server and a client pointed at it.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    next_ip: AtomicU32,
}

/// A business owner's session.
pub struct BusinessSession {
    pub token: String,
    pub business_id: String,
}

/// A portal customer's session.
pub struct CustomerSession {
    pub token: String,
    pub customer_id: String,
}

impl TestApp {
    /// Spawn a server with the default configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(ApiConfig::default()).await
    }

    /// Spawn a server with `config`, trusting forwarded client addresses.
    ///
    /// The helpers give every signup and login its own `X-Forwarded-For`
    /// address, which only counts when proxy headers are trusted.
    pub async fn spawn_with(config: ApiConfig) -> Self {
        Self::serve(ApiConfig {
            trust_proxy_headers: true,
            ..config
        })
        .await
    }

    /// Spawn a server with exactly `config`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn serve(config: ApiConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = reservio_api::app(AppState::new(config, Database::new()));
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            next_ip: AtomicU32::new(1),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client address no other helper call has used.
    ///
    /// Auth endpoints are throttled per client IP, so helpers that sign up
    /// or log in present a fresh forwarded address each time.
    pub fn fresh_ip(&self) -> String {
        let [_, b, c, d] = self.next_ip.fetch_add(1, Ordering::Relaxed).to_be_bytes();
        format!("10.{b}.{c}.{d}")
    }

    /// `POST` to an auth endpoint from a fresh client address.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn auth_post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .header("x-forwarded-for", self.fresh_ip())
            .json(body)
            .send()
            .await
            .expect("Failed to send auth request")
    }

    /// Request builder with bearer authentication.
    pub fn request(&self, method: reqwest::Method, token: &str, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
    }

    /// Authenticated `GET`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, token: &str, path: &str) -> Response {
        self.request(reqwest::Method::GET, token, path)
            .send()
            .await
            .expect("Failed to send GET")
    }

    /// Authenticated `POST` with a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, token: &str, path: &str, body: &Value) -> Response {
        self.request(reqwest::Method::POST, token, path)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST")
    }

    /// Authenticated `PATCH` with a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn patch(&self, token: &str, path: &str, body: &Value) -> Response {
        self.request(reqwest::Method::PATCH, token, path)
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH")
    }

    /// Authenticated `PUT` with a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn put(&self, token: &str, path: &str, body: &Value) -> Response {
        self.request(reqwest::Method::PUT, token, path)
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT")
    }

    /// Authenticated `DELETE`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn delete(&self, token: &str, path: &str) -> Response {
        self.request(reqwest::Method::DELETE, token, path)
            .send()
            .await
            .expect("Failed to send DELETE")
    }

    /// Sign up a business owner and their business.
    pub async fn signup_business(&self, email: &str, business_name: &str) -> BusinessSession {
        let resp = self
            .auth_post(
                "/api/auth/business/signup",
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": "Owner",
                    "business_name": business_name,
                }),
            )
            .await;
        let body = expect_json(resp, StatusCode::CREATED).await;
        BusinessSession {
            token: string(&body["access_token"]),
            business_id: string(&body["account"]["business_id"]),
        }
    }

    /// Sign up a portal customer of `business_id`.
    pub async fn signup_customer(&self, business_id: &str, email: &str) -> CustomerSession {
        let resp = self
            .auth_post(
                "/api/auth/customer/signup",
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": "Ada Lovelace",
                    "business_id": business_id,
                }),
            )
            .await;
        let body = expect_json(resp, StatusCode::CREATED).await;
        CustomerSession {
            token: string(&body["access_token"]),
            customer_id: string(&body["account"]["customer_id"]),
        }
    }

    /// Create a record with `POST path` and return its ID.
    pub async fn create(&self, token: &str, path: &str, body: &Value) -> String {
        let resp = self.post(token, path, body).await;
        let body = expect_json(resp, StatusCode::CREATED).await;
        string(&body["id"])
    }

    /// Create a staff member.
    pub async fn create_staff(&self, token: &str, name: &str) -> String {
        self.create(token, "/api/staff", &json!({ "name": name }))
            .await
    }

    /// Create a service performed by `staff_id`.
    pub async fn create_service(
        &self,
        token: &str,
        name: &str,
        price: &str,
        duration_minutes: u32,
        staff_id: &str,
    ) -> String {
        self.create(
            token,
            "/api/services",
            &json!({
                "name": name,
                "price": price,
                "duration_minutes": duration_minutes,
                "staff_ids": [staff_id],
            }),
        )
        .await
    }

    /// Create a customer.
    pub async fn create_customer(&self, token: &str, name: &str) -> String {
        self.create(token, "/api/customers", &json!({ "name": name }))
            .await
    }
}

/// Assert the response status and decode its JSON body.
///
/// # Panics
///
/// Panics on a status mismatch (showing the body) or a non-JSON body.
pub async fn expect_json(resp: Response, status: StatusCode) -> Value {
    let actual = resp.status();
    let text = resp.text().await.expect("Failed to read response body");
    assert_eq!(actual, status, "unexpected status, body: {text}");
    serde_json::from_str(&text).expect("Response body is not JSON")
}

/// A JSON string field.
///
/// # Panics
///
/// Panics if `value` is not a string.
#[must_use]
pub fn string(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected a string, got {value}"))
        .to_owned()
}

/// A money field (decimals are serialized as strings).
///
/// # Panics
///
/// Panics if `value` is not a decimal string.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    string(value).parse().expect("Invalid decimal")
}
