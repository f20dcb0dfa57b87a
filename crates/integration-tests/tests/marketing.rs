//! Integration tests for audiences and campaigns.

use reqwest::StatusCode;
use reservio_integration_tests::{BusinessSession, TestApp, expect_json, string};
use serde_json::json;

/// A business with two customers, one of whom has a four-booking series.
async fn fixture(app: &TestApp) -> BusinessSession {
    let owner = app.signup_business("owner@north.test", "Studio North").await;
    let staff = app.create_staff(&owner.token, "Grace").await;
    let service = app
        .create_service(&owner.token, "Cut", "40.00", 30, &staff)
        .await;
    let regular = app.create_customer(&owner.token, "Ada").await;
    app.create_customer(&owner.token, "Grace Hopper").await;

    let resp = app
        .post(
            &owner.token,
            "/api/bookings",
            &json!({
                "customer_id": regular,
                "service_id": service,
                "staff_id": staff,
                "start_at": "2024-01-01T09:00:00Z",
                "recurrence_rule": "weekly",
                "recurrence_end_date": "2024-01-22",
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    owner
}

async fn create_audience(app: &TestApp, owner: &BusinessSession, kind: &str) -> String {
    let resp = app
        .post(
            &owner.token,
            "/api/audiences",
            &json!({ "name": format!("{kind} customers"), "kind": kind }),
        )
        .await;
    let audience = expect_json(resp, StatusCode::CREATED).await;
    string(&audience["id"])
}

// ============================================================================
// Audiences
// ============================================================================

#[tokio::test]
async fn test_audience_sizes_follow_booking_history() {
    let app = TestApp::spawn().await;
    let owner = fixture(&app).await;

    let everyone = create_audience(&app, &owner, "all").await;
    let frequent = create_audience(&app, &owner, "frequent").await;
    create_audience(&app, &owner, "new").await;

    let resp = app.get(&owner.token, "/api/audiences").await;
    let audiences = expect_json(resp, StatusCode::OK).await;
    let sizes: Vec<(String, u64)> = audiences
        .as_array()
        .expect("Expected an array")
        .iter()
        .map(|a| {
            (
                string(&a["kind"]),
                a["customer_count"].as_u64().expect("customer_count"),
            )
        })
        .collect();
    assert!(sizes.contains(&("all".to_owned(), 2)));
    assert!(sizes.contains(&("frequent".to_owned(), 1)));
    assert!(sizes.contains(&("new".to_owned(), 0)));

    let resp = app
        .get(&owner.token, &format!("/api/audiences/{frequent}/members"))
        .await;
    let members = expect_json(resp, StatusCode::OK).await;
    assert_eq!(members.as_array().map(Vec::len), Some(1));
    assert_eq!(members[0]["name"], "Ada");

    let resp = app
        .get(&owner.token, &format!("/api/audiences/{everyone}"))
        .await;
    let audience = expect_json(resp, StatusCode::OK).await;
    assert_eq!(audience["customer_count"], 2);
}

#[tokio::test]
async fn test_audience_kind_can_change() {
    let app = TestApp::spawn().await;
    let owner = fixture(&app).await;
    let audience = create_audience(&app, &owner, "all").await;

    let resp = app
        .patch(
            &owner.token,
            &format!("/api/audiences/{audience}"),
            &json!({ "kind": "lapsed" }),
        )
        .await;
    let updated = expect_json(resp, StatusCode::OK).await;
    assert_eq!(updated["kind"], "lapsed");
    // The series ended long ago
    assert_eq!(updated["customer_count"], 1);
}

// ============================================================================
// Campaigns
// ============================================================================

#[tokio::test]
async fn test_campaign_send_freezes_campaign() {
    let app = TestApp::spawn().await;
    let owner = fixture(&app).await;
    let frequent = create_audience(&app, &owner, "frequent").await;

    let resp = app
        .post(
            &owner.token,
            "/api/campaigns",
            &json!({
                "name": "Loyalty",
                "subject": "Thank you",
                "body": "Your next cut is on us.",
                "audience_id": frequent,
            }),
        )
        .await;
    let campaign = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(campaign["status"], "draft");
    let path = format!("/api/campaigns/{}", string(&campaign["id"]));

    // The targeted audience cannot go away while the campaign is unsent
    let resp = app
        .delete(&owner.token, &format!("/api/audiences/{frequent}"))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post(&owner.token, &format!("{path}/send"), &json!({}))
        .await;
    let sent = expect_json(resp, StatusCode::OK).await;
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["recipient_count"], 1);
    assert!(!sent["sent_at"].is_null());

    let resp = app
        .patch(&owner.token, &path, &json!({ "name": "Too late" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post(&owner.token, &format!("{path}/send"), &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Once sent, the audience is free to delete
    let resp = app
        .delete(&owner.token, &format!("/api/audiences/{frequent}"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_campaign_requires_known_audience() {
    let app = TestApp::spawn().await;
    let owner = fixture(&app).await;

    let resp = app
        .post(
            &owner.token,
            "/api/campaigns",
            &json!({
                "name": "Ghost",
                "body": "Hello",
                "audience_id": uuid::Uuid::new_v4(),
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_campaign_without_audience_reaches_everyone() {
    let app = TestApp::spawn().await;
    let owner = fixture(&app).await;

    let resp = app
        .post(
            &owner.token,
            "/api/campaigns",
            &json!({ "name": "Newsletter", "body": "Spring hours" }),
        )
        .await;
    let campaign = expect_json(resp, StatusCode::CREATED).await;

    let resp = app
        .post(
            &owner.token,
            &format!("/api/campaigns/{}/send", string(&campaign["id"])),
            &json!({}),
        )
        .await;
    let sent = expect_json(resp, StatusCode::OK).await;
    assert_eq!(sent["recipient_count"], 2);
}
