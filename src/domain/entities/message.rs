//! Chat message entity and the chat use-case contract.
//!
//! The hub never stores messages itself. Persistence and business rules
//! (mentions, counters, membership) live behind [`ChatUsecase`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored message content types. The chat socket only carries text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
}

impl MessageType {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message as persisted by the chat use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Chat use-case errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Invalid message: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Persistence and business collaborator used by the chat hub.
///
/// Both calls are made from a connection's reader task; failures are logged
/// by the caller and never close the connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatUsecase: Send + Sync {
    /// Validate and store a message, returning the stored record.
    async fn send_message(
        &self,
        room_id: &str,
        sender_id: &str,
        message_type: MessageType,
        content: &str,
    ) -> Result<StoredMessage, ChatError>;

    /// Rooms the user currently belongs to.
    async fn find_rooms_by_user_id(&self, user_id: &str) -> Result<Vec<String>, ChatError>;
}
