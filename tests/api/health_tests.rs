//! Health Check API Tests

use crate::common::TestApp;

/// Basic health check returns 200 with a status field
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

/// Liveness probe always answers while the server runs
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health/live").await;

    assert_eq!(status, 200);
    assert!(body.contains("alive"));
}

/// Readiness probe reports the number of live chat connections
#[tokio::test]
async fn test_readiness_reports_connections() {
    let app = TestApp::spawn().await;
    let _ws = app.connect_user("alice").await;

    let (status, body) = app.get("/health/ready").await;

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["websocket"]["active_connections"], 1);
}

/// Metrics endpoint exposes hub counters
#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::spawn().await;
    let _ws = app.connect_user("alice").await;

    let (status, body) = app.get("/metrics").await;

    assert_eq!(status, 200);
    assert!(body.contains("social_hub_connections_active"));
}
