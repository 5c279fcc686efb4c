//! WebSocket Message Types
//!
//! The JSON envelope exchanged on every chat socket.

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Chat message, persisted and broadcast to a room
    Message,
    /// Typing indicator, broadcast to a room
    Typing,
    /// Client keepalive request
    Ping,
    /// Reply to `Ping`
    Pong,
    /// Presence change, broadcast to every connection
    UserStatus,
    /// Subscribe this connection to a room
    JoinRoom,
    /// Unsubscribe this connection from a room
    LeaveRoom,
}

impl MessageKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "typing" => Some(Self::Typing),
            "ping" => Some(Self::Ping),
            "pong" => Some(Self::Pong),
            "userStatus" => Some(Self::UserStatus),
            "joinRoom" => Some(Self::JoinRoom),
            "leaveRoom" => Some(Self::LeaveRoom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Typing => "typing",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::UserStatus => "userStatus",
            Self::JoinRoom => "joinRoom",
            Self::LeaveRoom => "leaveRoom",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outgoing (and echoed) wire message.
///
/// `sender_id` and `created_at` are always set by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WireMessage {
    /// Build a server-stamped message from `sender_id`.
    pub fn stamped(
        kind: MessageKind,
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind,
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            data,
            created_at: Some(Utc::now()),
        }
    }

    /// Keepalive reply addressed to the connection that pinged.
    pub fn pong(room_id: impl Into<String>) -> Self {
        Self::stamped(MessageKind::Pong, room_id, "", "", None)
    }

    /// Serialize once for fan-out; clones of the result share one buffer.
    pub fn encode(&self) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(self).map(Utf8Bytes::from)
    }
}

/// Raw inbound envelope.
///
/// `senderId` and `createdAt` are absent, so client-supplied values
/// are dropped during deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// A decoded inbound frame with a known type.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub kind: MessageKind,
    pub room_id: String,
    pub content: String,
    pub data: Option<serde_json::Value>,
}

/// Inbound decode failures. Neither closes the connection.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// Decode an inbound text frame.
pub fn decode_frame(text: &str) -> Result<InboundFrame, FrameError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let kind = MessageKind::parse(&raw.kind).ok_or(FrameError::UnknownType(raw.kind))?;

    Ok(InboundFrame {
        kind,
        room_id: raw.room_id.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        data: raw.data,
    })
}
