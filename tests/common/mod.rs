//! Common Test Utilities
//!
//! Boots the real hub on an ephemeral port and drives it over WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use social_hub::config::{CorsSettings, JwtSettings, ServerSettings, Settings, WebSocketSettings};
use social_hub::domain::ChatUsecase;
use social_hub::infrastructure::auth::JwtAuthClient;
use social_hub::infrastructure::repositories::InMemoryChatRepository;
use social_hub::presentation::websocket::{Hub, WireMessage};
use social_hub::startup::Application;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-32-plus-chars";

/// How long to wait for an expected frame
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a connection must stay quiet to count as "received nothing"
pub const SILENCE: Duration = Duration::from_millis(300);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Running hub plus handles on its collaborators
pub struct TestApp {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
    pub chat: Arc<InMemoryChatRepository>,
    pub auth: JwtAuthClient,
}

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        jwt: JwtSettings {
            secret: TEST_JWT_SECRET.into(),
        },
        websocket: WebSocketSettings::default(),
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        environment: "test".into(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let chat = Arc::new(InMemoryChatRepository::new());
        Self::spawn_with(chat.clone(), chat).await
    }

    /// Boot with a custom chat use case. `chat` stays the observable store
    /// tests seed and inspect.
    pub async fn spawn_with(
        chat: Arc<InMemoryChatRepository>,
        usecase: Arc<dyn ChatUsecase>,
    ) -> Self {
        let auth = JwtAuthClient::new(TEST_JWT_SECRET);

        let app = Application::build_with(test_settings(), Arc::new(auth.clone()), usecase)
            .await
            .expect("failed to build application");
        let addr = app.local_addr().expect("no local addr");
        let hub = app.hub();

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        Self {
            addr,
            hub,
            chat,
            auth,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.auth
            .issue(user_id, chrono::Duration::minutes(5))
            .expect("failed to issue token")
    }

    /// Open a socket with an arbitrary query string.
    pub async fn connect_raw(&self, query: &str) -> WsClient {
        let url = format!("ws://{}/ws{}", self.addr, query);
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("upgrade failed");
        ws
    }

    /// Connect as `user_id` and wait until the hub has registered the session.
    pub async fn connect_user(&self, user_id: &str) -> WsClient {
        let previous = self.hub.connection_for_user(user_id).map(|c| c.id());
        let ws = self
            .connect_raw(&format!("?token={}", self.token_for(user_id)))
            .await;

        let hub = self.hub.clone();
        let user = user_id.to_string();
        wait_until(move || {
            hub.connection_for_user(&user)
                .map(|c| Some(c.id()) != previous)
                .unwrap_or(false)
        })
        .await;
        ws
    }

    /// Plain HTTP GET; returns (status, body).
    pub async fn get(&self, path: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(self.addr).await.expect("connect failed");
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, self.addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        let status = raw
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .expect("no status line");
        let body = raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default();
        (status, body)
    }
}

/// Poll `condition` until it holds or a few seconds pass.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send failed");
}

/// Next application frame, skipping transport keepalives.
pub async fn next_message(ws: &mut WsClient) -> WireMessage {
    loop {
        let msg = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("invalid wire message")
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Assert no application frame arrives for a short while.
pub async fn expect_silence(ws: &mut WsClient) {
    match tokio::time::timeout(SILENCE, ws.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => {}
        Ok(other) => panic!("expected silence, got {:?}", other),
    }
}

/// Read until a close frame arrives and return its code.
pub async fn expect_close(ws: &mut WsClient) -> (u16, String) {
    loop {
        let msg = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close");
        match msg {
            Some(Ok(Message::Close(Some(frame)))) => {
                return (u16::from(frame.code), frame.reason.to_string())
            }
            Some(Ok(Message::Close(None))) => panic!("close frame without code"),
            Some(Ok(_)) => continue,
            other => panic!("connection ended without close frame: {:?}", other),
        }
    }
}
