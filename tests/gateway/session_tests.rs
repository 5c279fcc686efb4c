//! Session lifecycle tests

use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use serde_json::json;

use social_hub::domain::{ChatError, ChatUsecase, MessageType, StoredMessage};
use social_hub::infrastructure::repositories::InMemoryChatRepository;

use crate::common::{expect_close, next_message, send_json, wait_until, TestApp};

/// Chat use case whose storage blows up mid-request.
struct ExplodingChat {
    rooms: Arc<InMemoryChatRepository>,
}

#[async_trait]
impl ChatUsecase for ExplodingChat {
    async fn send_message(
        &self,
        _room_id: &str,
        _sender_id: &str,
        _message_type: MessageType,
        _content: &str,
    ) -> Result<StoredMessage, ChatError> {
        panic!("storage driver crashed")
    }

    async fn find_rooms_by_user_id(&self, user_id: &str) -> Result<Vec<String>, ChatError> {
        self.rooms.find_rooms_by_user_id(user_id).await
    }
}

#[tokio::test]
async fn test_second_login_supersedes_first() {
    let app = TestApp::spawn().await;

    let mut first = app.connect_user("A").await;
    let first_id = app.hub.connection_for_user("A").unwrap().id();

    let mut second = app.connect_user("A").await;

    let (code, reason) = expect_close(&mut first).await;
    assert_eq!(code, 1000);
    assert_eq!(reason, "session superseded");

    let current = app.hub.connection_for_user("A").unwrap();
    assert_ne!(current.id(), first_id);
    assert!(!app.hub.contains(first_id));
    assert_eq!(app.hub.connection_count(), 1);

    // The replacement stays fully usable.
    send_json(&mut second, json!({"type": "ping"})).await;
    next_message(&mut second).await;
}

#[tokio::test]
async fn test_client_close_unregisters() {
    let app = TestApp::spawn().await;

    let mut ws = app.connect_user("A").await;
    ws.close(None).await.unwrap();

    let hub = app.hub.clone();
    wait_until(move || !hub.is_user_online("A")).await;
    assert_eq!(app.hub.connection_count(), 0);
}

#[tokio::test]
async fn test_dropped_socket_unregisters() {
    let app = TestApp::spawn().await;

    let ws = app.connect_user("A").await;
    drop(ws);

    let hub = app.hub.clone();
    wait_until(move || hub.connection_count() == 0).await;
}

#[tokio::test]
async fn test_panic_in_read_path_closes_with_internal_error() {
    let store = Arc::new(InMemoryChatRepository::new());
    store.add_member("r1", "B");
    let chat = Arc::new(ExplodingChat {
        rooms: store.clone(),
    });
    let app = TestApp::spawn_with(store, chat).await;

    let mut alice = app.connect_user("A").await;
    let mut bob = app.connect_user("B").await;

    send_json(&mut alice, json!({"type": "message", "roomId": "r1", "content": "hi"})).await;

    let (code, reason) = expect_close(&mut alice).await;
    assert_eq!(code, 1011);
    assert_eq!(reason, "internal error");

    let hub = app.hub.clone();
    wait_until(move || !hub.is_user_online("A")).await;
    assert_eq!(app.hub.connection_count(), 1);

    // Other sessions are unaffected.
    send_json(&mut bob, json!({"type": "ping"})).await;
    next_message(&mut bob).await;
}
