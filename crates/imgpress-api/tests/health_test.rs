//! Health endpoint integration tests.
//!
//! Run with: `cargo test -p imgpress-api --test health_test`

mod helpers;

use helpers::setup_test_app;

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/health").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].as_str().is_some());
    assert!(body["memory"].is_object());
}
