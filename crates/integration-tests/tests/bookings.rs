//! Integration tests for bookings, recurrence and staff availability.

use reqwest::StatusCode;
use reservio_integration_tests::{BusinessSession, TestApp, expect_json, string};
use serde_json::{Value, json};

struct Fixture {
    app: TestApp,
    owner: BusinessSession,
    staff_id: String,
    service_id: String,
    customer_id: String,
}

async fn fixture() -> Fixture {
    let app = TestApp::spawn().await;
    let owner = app.signup_business("owner@north.test", "Studio North").await;
    let staff_id = app.create_staff(&owner.token, "Grace").await;
    let service_id = app
        .create_service(&owner.token, "Cut", "40.00", 30, &staff_id)
        .await;
    let customer_id = app.create_customer(&owner.token, "Ada").await;
    Fixture {
        app,
        owner,
        staff_id,
        service_id,
        customer_id,
    }
}

impl Fixture {
    fn draft(&self, start_at: &str) -> Value {
        json!({
            "customer_id": self.customer_id,
            "service_id": self.service_id,
            "staff_id": self.staff_id,
            "start_at": start_at,
        })
    }

    async fn book(&self, body: &Value) -> Vec<Value> {
        let resp = self.app.post(&self.owner.token, "/api/bookings", body).await;
        let created = expect_json(resp, StatusCode::CREATED).await;
        created.as_array().expect("Expected an array").clone()
    }
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_single_booking_snapshots() {
    let f = fixture().await;
    let bookings = f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    assert_eq!(bookings.len(), 1);

    let booking = &bookings[0];
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["payment_status"], "unpaid");
    assert_eq!(booking["end_at"], "2024-01-01T09:30:00Z");
    assert_eq!(booking["customer"]["name"], "Ada");
    assert_eq!(booking["service"]["name"], "Cut");
    assert_eq!(booking["staff"]["name"], "Grace");
    assert!(booking["parent_booking_id"].is_null());
}

#[tokio::test]
async fn test_weekly_recurrence_creates_series() {
    let f = fixture().await;
    let mut draft = f.draft("2024-01-01T09:00:00Z");
    draft["recurrence_rule"] = json!("weekly");
    draft["recurrence_end_date"] = json!("2024-01-22");

    let bookings = f.book(&draft).await;
    let starts: Vec<&str> = bookings
        .iter()
        .map(|b| b["start_at"].as_str().expect("start_at"))
        .collect();
    assert_eq!(
        starts,
        [
            "2024-01-01T09:00:00Z",
            "2024-01-08T09:00:00Z",
            "2024-01-15T09:00:00Z",
            "2024-01-22T09:00:00Z",
        ]
    );

    // The first occurrence is the parent of the whole series
    let parent = &bookings[0]["id"];
    assert!(bookings.iter().all(|b| &b["parent_booking_id"] == parent));

    // Deleting with `series` removes every occurrence
    let resp = f
        .app
        .delete(
            &f.owner.token,
            &format!("/api/bookings/{}?series=true", string(&bookings[2]["id"])),
        )
        .await;
    let deleted = expect_json(resp, StatusCode::OK).await;
    assert_eq!(deleted["deleted"], 4);

    let resp = f.app.get(&f.owner.token, "/api/bookings").await;
    assert_eq!(expect_json(resp, StatusCode::OK).await, json!([]));
}

#[tokio::test]
async fn test_recurrence_requires_end_date() {
    let f = fixture().await;
    let mut draft = f.draft("2024-01-01T09:00:00Z");
    draft["recurrence_rule"] = json!("monthly");

    let resp = f.app.post(&f.owner.token, "/api/bookings", &draft).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_service_rejected() {
    let f = fixture().await;
    let mut draft = f.draft("2024-01-01T09:00:00Z");
    draft["service_id"] = json!(uuid::Uuid::new_v4());

    let resp = f.app.post(&f.owner.token, "/api/bookings", &draft).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Double Booking
// ============================================================================

#[tokio::test]
async fn test_overlaps_allowed_by_default() {
    let f = fixture().await;
    f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    f.book(&f.draft("2024-01-01T09:15:00Z")).await;
}

#[tokio::test]
async fn test_double_booking_prevented_when_enabled() {
    let f = fixture().await;

    let resp = f.app.get(&f.owner.token, "/api/settings").await;
    let mut settings = expect_json(resp, StatusCode::OK).await;
    settings["prevent_double_booking"] = json!(true);
    let resp = f
        .app
        .put(&f.owner.token, "/api/settings", &settings)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    f.book(&f.draft("2024-01-01T09:00:00Z")).await;

    let resp = f
        .app
        .post(
            &f.owner.token,
            "/api/bookings",
            &f.draft("2024-01-01T09:15:00Z"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Back-to-back is fine: intervals are half-open
    f.book(&f.draft("2024-01-01T09:30:00Z")).await;
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test]
async fn test_reschedule_recomputes_end() {
    let f = fixture().await;
    let bookings = f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    let id = string(&bookings[0]["id"]);

    let resp = f
        .app
        .patch(
            &f.owner.token,
            &format!("/api/bookings/{id}"),
            &json!({ "start_at": "2024-01-02T14:00:00Z", "notes": "Moved" }),
        )
        .await;
    let booking = expect_json(resp, StatusCode::OK).await;
    assert_eq!(booking["end_at"], "2024-01-02T14:30:00Z");
    assert_eq!(booking["notes"], "Moved");
}

#[tokio::test]
async fn test_terminal_status_is_final() {
    let f = fixture().await;
    let bookings = f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    let path = format!("/api/bookings/{}", string(&bookings[0]["id"]));

    let resp = f
        .app
        .patch(&f.owner.token, &path, &json!({ "status": "cancelled" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = f
        .app
        .patch(&f.owner.token, &path, &json!({ "status": "confirmed" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_completion_requests_review() {
    let f = fixture().await;
    let bookings = f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    let path = format!("/api/bookings/{}", string(&bookings[0]["id"]));

    let resp = f
        .app
        .patch(&f.owner.token, &path, &json!({ "status": "completed" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The event worker stamps the booking asynchronously
    let mut stamped = false;
    for _ in 0..50 {
        let resp = f.app.get(&f.owner.token, &path).await;
        let booking = expect_json(resp, StatusCode::OK).await;
        if !booking["review_requested_at"].is_null() {
            stamped = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(stamped, "review was never requested");
}

#[tokio::test]
async fn test_filter_by_status() {
    let f = fixture().await;
    let first = f.book(&f.draft("2024-01-01T09:00:00Z")).await;
    f.book(&f.draft("2024-01-01T11:00:00Z")).await;

    let resp = f
        .app
        .patch(
            &f.owner.token,
            &format!("/api/bookings/{}", string(&first[0]["id"])),
            &json!({ "status": "no_show" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = f
        .app
        .get(&f.owner.token, "/api/bookings?status=confirmed")
        .await;
    let confirmed = expect_json(resp, StatusCode::OK).await;
    assert_eq!(confirmed.as_array().map(Vec::len), Some(1));
    assert_eq!(confirmed[0]["start_at"], "2024-01-01T11:00:00Z");
}

// ============================================================================
// Staff
// ============================================================================

#[tokio::test]
async fn test_deleting_staff_detaches_services() {
    let f = fixture().await;
    let resp = f
        .app
        .delete(&f.owner.token, &format!("/api/staff/{}", f.staff_id))
        .await;
    assert!(resp.status().is_success());

    let resp = f
        .app
        .get(&f.owner.token, &format!("/api/services/{}", f.service_id))
        .await;
    let service = expect_json(resp, StatusCode::OK).await;
    assert_eq!(service["staff_ids"], json!([]));
}
