//! Sign webhook payloads for local testing.
//!
//! The printed header can be replayed against a local server:
//!
//! ```bash
//! curl -X POST localhost:8080/api/webhooks/stripe \
//!     -H "Stripe-Signature: t=...,v1=..." --data-binary @event.json
//! ```

use std::path::Path;

use chrono::Utc;
use reservio_api::services::{WebhookError, stripe};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

/// Errors from `stripe-sign`.
#[derive(Debug, Error)]
pub enum SignError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

/// Build the `Stripe-Signature` value for the payload in `payload_path`.
///
/// The secret is read from the environment variable named `secret_env`
/// (`.env` is loaded first). `timestamp` defaults to the current time.
///
/// # Errors
///
/// Returns an error if the secret is unset, the payload cannot be read, or
/// the signature cannot be computed.
pub fn signature_header(
    secret_env: &str,
    payload_path: &Path,
    timestamp: Option<i64>,
) -> Result<String, SignError> {
    dotenvy::dotenv().ok();

    let secret = std::env::var(secret_env)
        .map(SecretString::from)
        .map_err(|_| SignError::MissingEnvVar(secret_env.to_owned()))?;
    let payload = std::fs::read_to_string(payload_path)?;
    let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp());

    Ok(stripe::sign(secret.expose_secret(), timestamp, &payload)?)
}

/// Log the `Stripe-Signature` header for a payload.
///
/// # Errors
///
/// See [`signature_header`].
pub fn sign(
    secret_env: &str,
    payload_path: &Path,
    timestamp: Option<i64>,
) -> Result<(), SignError> {
    let header = signature_header(secret_env, payload_path, timestamp)?;
    info!(path = %payload_path.display(), "Stripe-Signature: {header}");
    Ok(())
}
