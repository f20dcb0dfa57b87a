//! Stripe webhook verification and payment status updates.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>` where the HMAC-SHA256 is computed over
//! `"{t}.{raw body}"` with the endpoint's signing secret.
//! See <https://docs.stripe.com/webhooks#verify-manually>.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reservio_core::types::{BookingId, PaymentStatus};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::auth::constant_time_compare;
use crate::db::Database;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Errors from webhook handling.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signing secret is configured.
    #[error("stripe webhooks are not configured")]
    NotConfigured,

    #[error("missing Stripe-Signature header")]
    MissingSignature,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The parts of a Stripe event the service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// What a delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A booking's payment status changed.
    Updated {
        booking_id: BookingId,
        payment_status: PaymentStatus,
    },
    /// The event type is not one the service reacts to.
    Unhandled,
    /// The event referenced no known booking.
    NoBooking,
}

fn mac(secret: &str, timestamp: &str, payload: &str) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSignature` if the HMAC cannot be keyed.
pub fn sign(secret: &str, timestamp: i64, payload: &str) -> Result<String, WebhookError> {
    let timestamp = timestamp.to_string();
    let signature = mac(secret, &timestamp, payload)?;
    Ok(format!("t={timestamp},v1={signature}"))
}

/// Check a `Stripe-Signature` header against the raw body.
///
/// Any of several `v1` entries may match (Stripe sends more than one while
/// a secret is being rolled).
///
/// # Errors
///
/// Returns `WebhookError::InvalidSignature` for a malformed header, a
/// timestamp outside the tolerance window, or no matching signature.
#[instrument(skip_all)]
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| WebhookError::InvalidSignature("missing timestamp".to_owned()))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidSignature("invalid timestamp".to_owned()))?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::InvalidSignature(
            "timestamp outside tolerance".to_owned(),
        ));
    }

    let expected = mac(secret, timestamp, payload)?;
    if !signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Err(WebhookError::InvalidSignature(
            "signature mismatch".to_owned(),
        ));
    }

    debug!("Stripe signature verified");
    Ok(())
}

/// Payment status an event type maps to.
fn status_for(event_type: &str) -> Option<PaymentStatus> {
    match event_type {
        "payment_intent.succeeded" => Some(PaymentStatus::Paid),
        "payment_intent.payment_failed" => Some(PaymentStatus::Failed),
        "charge.refunded" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// The booking ID in `metadata.booking_id`, if any.
fn metadata_booking_id(object: &Value) -> Option<BookingId> {
    object
        .pointer("/metadata/booking_id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse().ok())
}

/// The payment intent an event object belongs to.
fn payment_intent_id<'v>(event_type: &str, object: &'v Value) -> Option<&'v str> {
    let field = if event_type.starts_with("charge.") {
        "payment_intent"
    } else {
        "id"
    };
    object.get(field).and_then(Value::as_str)
}

/// Apply a verified event to the booking it concerns.
///
/// The booking is found by `metadata.booking_id`. Only events without one
/// fall back to a match on the stored payment intent ID. Events are not
/// tenant-scoped, so every business is searched.
#[instrument(skip(db, event), fields(event_id = %event.id, event_type = %event.event_type))]
pub async fn apply_event(db: &Database, event: &StripeEvent) -> WebhookOutcome {
    let Some(payment_status) = status_for(&event.event_type) else {
        info!("Ignoring unhandled Stripe event");
        return WebhookOutcome::Unhandled;
    };
    let object = &event.data.object;
    let by_id = metadata_booking_id(object);
    let by_intent = payment_intent_id(&event.event_type, object);

    let mut tables = db.write().await;
    let booking = match (by_id, by_intent) {
        (Some(id), _) => tables
            .tenants_mut()
            .find_map(|tenant| tenant.bookings.iter_mut().find(|b| b.id == id)),
        (None, Some(intent)) => tables.tenants_mut().find_map(|tenant| {
            tenant
                .bookings
                .iter_mut()
                .find(|b| b.payment_intent_id.as_deref() == Some(intent))
        }),
        (None, None) => None,
    };
    let Some(booking) = booking else {
        warn!("Stripe event references no known booking");
        return WebhookOutcome::NoBooking;
    };

    booking.payment_status = payment_status;
    booking.updated_at = Utc::now();
    if booking.payment_intent_id.is_none() {
        booking.payment_intent_id = by_intent.map(str::to_owned);
    }
    info!(booking_id = %booking.id, ?payment_status, "Booking payment status updated");
    WebhookOutcome::Updated {
        booking_id: booking.id,
        payment_status,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use reservio_core::domain::{
        Booking, Business, CustomerSnapshot, ServiceSnapshot, StaffSnapshot,
    };
    use reservio_core::types::{
        BookingStatus, BusinessId, CustomerId, Email, ServiceId, StaffId,
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::db::Tenant;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn test_signed_payload_verifies() {
        let now = Utc::now().timestamp();
        let header = sign(SECRET, now, "{}").unwrap();
        assert!(header.starts_with(&format!("t={now},v1=")));
        assert!(verify_signature(SECRET, &header, "{}", now).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let now = Utc::now().timestamp();
        let header = sign(SECRET, now, r#"{"a":1}"#).unwrap();
        assert!(matches!(
            verify_signature(SECRET, &header, r#"{"a":2}"#, now),
            Err(WebhookError::InvalidSignature(_))
        ));
        assert!(verify_signature("whsec_other", &header, r#"{"a":1}"#, now).is_err());
    }

    #[test]
    fn test_timestamp_tolerance() {
        let now = Utc::now().timestamp();
        let header = sign(SECRET, now - 301, "{}").unwrap();
        assert!(verify_signature(SECRET, &header, "{}", now).is_err());
        let header = sign(SECRET, now - 299, "{}").unwrap();
        assert!(verify_signature(SECRET, &header, "{}", now).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let now = Utc::now().timestamp();
        let good = sign(SECRET, now, "{}").unwrap();
        let signature = good.split_once(",v1=").unwrap().1;
        let header = format!("t={now},v1=deadbeef,v0=ignored,v1={signature}");
        assert!(verify_signature(SECRET, &header, "{}", now).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "v1=abc", "t=soon,v1=abc"] {
            assert!(verify_signature(SECRET, header, "{}", 0).is_err(), "{header}");
        }
    }

    fn tenant(name: &str) -> Tenant {
        Tenant::new(Business {
            id: BusinessId::new(),
            name: name.to_owned(),
            owner_email: Email::parse(&format!("owner@{name}.test")).unwrap(),
            suspended: false,
            created_at: Utc::now(),
        })
    }

    fn booking(payment_intent: Option<&str>) -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId::new(),
            start_at: now,
            end_at: now + TimeDelta::minutes(45),
            status: BookingStatus::Confirmed,
            customer: CustomerSnapshot {
                id: CustomerId::new(),
                name: "Rae".to_owned(),
                email: None,
            },
            service: ServiceSnapshot {
                id: ServiceId::new(),
                name: "Gel".to_owned(),
                price: Decimal::from(35),
                duration_minutes: 45,
            },
            staff: StaffSnapshot {
                id: StaffId::new(),
                name: "Tam".to_owned(),
            },
            recurrence_rule: None,
            recurrence_end_date: None,
            parent_booking_id: None,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: payment_intent.map(str::to_owned),
            transaction_id: None,
            notes: None,
            review_requested_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn db_with_booking(payment_intent: Option<&str>) -> (Database, BookingId) {
        let mut tenant = tenant("nails");
        let booking = booking(payment_intent);
        let id = booking.id;
        tenant.bookings.insert(booking).unwrap();
        let db = Database::new();
        db.write().await.insert_tenant(tenant).unwrap();
        (db, id)
    }

    fn event(event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": { "object": object },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_succeeded_by_metadata() {
        let (db, id) = db_with_booking(None).await;
        let outcome = apply_event(
            &db,
            &event(
                "payment_intent.succeeded",
                json!({ "id": "pi_1", "metadata": { "booking_id": id.to_string() } }),
            ),
        )
        .await;
        assert_eq!(
            outcome,
            WebhookOutcome::Updated {
                booking_id: id,
                payment_status: PaymentStatus::Paid
            }
        );
    }

    #[tokio::test]
    async fn test_refund_by_payment_intent() {
        let (db, id) = db_with_booking(Some("pi_42")).await;
        let outcome = apply_event(
            &db,
            &event(
                "charge.refunded",
                json!({ "id": "ch_1", "payment_intent": "pi_42" }),
            ),
        )
        .await;
        assert_eq!(
            outcome,
            WebhookOutcome::Updated {
                booking_id: id,
                payment_status: PaymentStatus::Refunded
            }
        );

        let failed = apply_event(
            &db,
            &event("payment_intent.payment_failed", json!({ "id": "pi_42" })),
        )
        .await;
        assert!(matches!(
            failed,
            WebhookOutcome::Updated {
                payment_status: PaymentStatus::Failed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unhandled_and_unknown() {
        let (db, _) = db_with_booking(None).await;
        assert_eq!(
            apply_event(&db, &event("customer.created", json!({}))).await,
            WebhookOutcome::Unhandled
        );
        assert_eq!(
            apply_event(&db, &event("payment_intent.succeeded", json!({ "id": "pi_x" }))).await,
            WebhookOutcome::NoBooking
        );
    }

    #[tokio::test]
    async fn test_metadata_wins_over_intent() {
        // An earlier booking carries the intent; the event names another one
        let mut nails = tenant("nails");
        let holder = booking(Some("pi_1"));
        let target = booking(None);
        let (holder_id, target_id) = (holder.id, target.id);
        nails.bookings.insert(holder).unwrap();
        let mut brows = tenant("brows");
        brows.bookings.insert(target).unwrap();
        let db = Database::new();
        db.write().await.insert_tenant(nails).unwrap();
        db.write().await.insert_tenant(brows).unwrap();

        let outcome = apply_event(
            &db,
            &event(
                "payment_intent.succeeded",
                json!({ "id": "pi_1", "metadata": { "booking_id": target_id.to_string() } }),
            ),
        )
        .await;
        assert_eq!(
            outcome,
            WebhookOutcome::Updated {
                booking_id: target_id,
                payment_status: PaymentStatus::Paid
            }
        );

        let tables = db.read().await;
        let holder = tables
            .tenants()
            .find_map(|t| t.bookings.iter().find(|b| b.id == holder_id))
            .unwrap();
        assert_eq!(holder.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_metadata_does_not_fall_back() {
        let (db, _) = db_with_booking(Some("pi_1")).await;
        let outcome = apply_event(
            &db,
            &event(
                "payment_intent.succeeded",
                json!({ "id": "pi_1", "metadata": { "booking_id": BookingId::new().to_string() } }),
            ),
        )
        .await;
        assert_eq!(outcome, WebhookOutcome::NoBooking);
    }
}
