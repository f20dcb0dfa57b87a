//! Inbound webhooks.

use axum::{Router, extract::State, http::HeaderMap, routing::post};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::extract::Json;
use crate::services::WebhookError;
use crate::services::stripe::{self, StripeEvent, WebhookOutcome};
use crate::state::AppState;

/// Header carrying Stripe's signature.
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// Acknowledgement sent back to Stripe.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// `updated`, `unhandled` or `no_booking`.
    pub outcome: &'static str,
}

/// Verify and apply a Stripe event.
///
/// Events that match no booking or that the service does not handle are
/// still acknowledged with 200 so Stripe stops retrying them.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>> {
    let secret = state
        .config()
        .stripe_webhook_secret
        .as_ref()
        .ok_or(WebhookError::NotConfigured)?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    stripe::verify_signature(
        secret.expose_secret(),
        signature,
        &body,
        Utc::now().timestamp(),
    )?;
    let event: StripeEvent = serde_json::from_str(&body).map_err(WebhookError::from)?;

    let outcome = match stripe::apply_event(state.db(), &event).await {
        WebhookOutcome::Updated { .. } => "updated",
        WebhookOutcome::Unhandled => "unhandled",
        WebhookOutcome::NoBooking => "no_booking",
    };
    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
