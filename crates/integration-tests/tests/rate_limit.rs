//! Integration tests for auth endpoint throttling.

use reqwest::StatusCode;
use reservio_api::config::ApiConfig;
use reservio_integration_tests::{PASSWORD, TestApp};
use serde_json::json;

async fn login_from(app: &TestApp, ip: &str) -> StatusCode {
    app.client
        .post(app.url("/api/auth/business/login"))
        .header("x-forwarded-for", ip)
        .json(&json!({ "email": "nobody@north.test", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to send login")
        .status()
}

#[tokio::test]
async fn test_login_burst_is_throttled_per_client() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        assert_eq!(
            login_from(&app, "203.0.113.7").await,
            StatusCode::UNAUTHORIZED
        );
    }
    assert_eq!(
        login_from(&app, "203.0.113.7").await,
        StatusCode::TOO_MANY_REQUESTS
    );

    // Another client still has its full budget
    assert_eq!(
        login_from(&app, "198.51.100.1").await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_forwarded_for_ignored_by_default() {
    let app = TestApp::serve(ApiConfig::default()).await;

    // Without a trusted proxy every request counts against the peer address
    for n in 0..5 {
        let ip = format!("203.0.113.{n}");
        assert_eq!(login_from(&app, &ip).await, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        login_from(&app, "198.51.100.1").await,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_other_routes_are_not_throttled() {
    let app = TestApp::spawn().await;
    for _ in 0..10 {
        let resp = app
            .client
            .get(app.url("/health"))
            .header("x-forwarded-for", "203.0.113.7")
            .send()
            .await
            .expect("Failed to send health check");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
