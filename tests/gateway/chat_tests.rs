//! End-to-end message routing tests

use pretty_assertions::assert_eq;
use serde_json::json;

use social_hub::domain::MessageType;
use social_hub::presentation::websocket::MessageKind;

use crate::common::{expect_silence, next_message, send_json, TestApp};

#[tokio::test]
async fn test_room_message_reaches_members_only() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "B");
    app.chat.add_member("r2", "C");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;
    let mut carol = app.connect_user("C").await;

    send_json(&mut alice, json!({"type": "message", "roomId": "r1", "content": "hi"})).await;

    let received = next_message(&mut bob).await;
    assert_eq!(received.kind, MessageKind::Message);
    assert_eq!(received.room_id, "r1");
    assert_eq!(received.sender_id, "A");
    assert_eq!(received.content, "hi");
    assert!(received.created_at.is_some());

    // Sending subscribed the author, so the echo comes back too.
    let echo = next_message(&mut alice).await;
    assert_eq!(echo.sender_id, "A");
    assert_eq!(echo.content, "hi");

    expect_silence(&mut carol).await;

    let stored = app.chat.messages_in("r1");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sender_id, "A");
    assert_eq!(stored[0].content, "hi");
    assert_eq!(stored[0].message_type, MessageType::Text);
}

#[tokio::test]
async fn test_client_supplied_sender_is_overwritten() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "B");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;

    send_json(
        &mut alice,
        json!({"type": "message", "roomId": "r1", "senderId": "mallory", "content": "hi"}),
    )
    .await;

    let received = next_message(&mut bob).await;
    assert_eq!(received.sender_id, "A");
    assert_eq!(app.chat.messages_in("r1")[0].sender_id, "A");
}

#[tokio::test]
async fn test_user_status_reaches_everyone() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "B");
    app.chat.add_member("r2", "C");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;
    let mut carol = app.connect_user("C").await;

    send_json(&mut alice, json!({"type": "userStatus", "content": "online"})).await;

    for ws in [&mut bob, &mut carol] {
        let received = next_message(ws).await;
        assert_eq!(received.kind, MessageKind::UserStatus);
        assert_eq!(received.sender_id, "A");
        assert_eq!(received.content, "online");
    }
}

#[tokio::test]
async fn test_typing_is_room_scoped() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "A");
    app.chat.add_member("r1", "B");
    app.chat.add_member("r2", "C");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;
    let mut carol = app.connect_user("C").await;

    send_json(&mut alice, json!({"type": "typing", "roomId": "r1"})).await;

    let received = next_message(&mut bob).await;
    assert_eq!(received.kind, MessageKind::Typing);
    assert_eq!(received.sender_id, "A");
    expect_silence(&mut carol).await;

    // Typing is never stored.
    assert_eq!(app.chat.message_count(), 0);
}

#[tokio::test]
async fn test_bad_frames_do_not_close_connection() {
    let app = TestApp::spawn().await;
    let mut alice = app.connect_user("A").await;

    send_json(&mut alice, json!({"type": "teleport", "roomId": "r1"})).await;
    send_json(&mut alice, json!({"type": "message", "roomId": "r1", "content": ""})).await;
    send_json(&mut alice, json!({"type": "ping", "roomId": "r1"})).await;

    let pong = next_message(&mut alice).await;
    assert_eq!(pong.kind, MessageKind::Pong);
    assert_eq!(pong.room_id, "r1");
    assert_eq!(app.chat.message_count(), 0);
    assert!(app.hub.is_user_online("A"));
}

#[tokio::test]
async fn test_empty_content_is_not_broadcast() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "B");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;

    send_json(&mut alice, json!({"type": "message", "roomId": "r1", "content": ""})).await;

    expect_silence(&mut bob).await;
    assert!(app.chat.messages_in("r1").is_empty());
    assert!(app.hub.is_user_online("A"));
}

#[tokio::test]
async fn test_join_and_leave_room() {
    let app = TestApp::spawn().await;
    app.chat.add_member("r1", "A");

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;

    send_json(&mut bob, json!({"type": "joinRoom", "roomId": "r1"})).await;
    send_json(&mut bob, json!({"type": "ping"})).await;
    assert_eq!(next_message(&mut bob).await.kind, MessageKind::Pong);

    send_json(&mut alice, json!({"type": "typing", "roomId": "r1"})).await;
    assert_eq!(next_message(&mut bob).await.kind, MessageKind::Typing);

    send_json(&mut bob, json!({"type": "leaveRoom", "roomId": "r1"})).await;
    send_json(&mut bob, json!({"type": "ping"})).await;
    assert_eq!(next_message(&mut bob).await.kind, MessageKind::Pong);

    send_json(&mut alice, json!({"type": "typing", "roomId": "r1"})).await;
    expect_silence(&mut bob).await;
}
