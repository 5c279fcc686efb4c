//! Connection Lookup API Tests

use serde_json::json;

use crate::common::{next_message, send_json, TestApp};

#[tokio::test]
async fn test_connected_user_lookup_lists_rooms() {
    let app = TestApp::spawn().await;
    app.chat.add_member("general", "alice");
    let mut ws = app.connect_user("alice").await;

    // Joining over the socket shows up in the lookup.
    send_json(&mut ws, json!({"type": "joinRoom", "roomId": "random"})).await;
    send_json(&mut ws, json!({"type": "ping"})).await;
    next_message(&mut ws).await;

    let (status, body) = app.get("/api/v1/connections/alice").await;

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["userId"], "alice");
    assert_eq!(json["rooms"], json!(["general", "random"]));
}

#[tokio::test]
async fn test_offline_user_lookup_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/v1/connections/nobody").await;

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["code"], 10001);
}
