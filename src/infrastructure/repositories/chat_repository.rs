//! In-memory chat repository.
//!
//! A [`ChatUsecase`] implementation that keeps rooms and messages in process
//! memory. The production document store lives behind the same trait; this
//! one lets the hub run standalone and gives tests an observable collaborator.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{ChatError, ChatUsecase, MessageType, StoredMessage};

/// Maximum stored content length in characters
pub const MAX_CONTENT_LENGTH: usize = 4000;

#[derive(Debug, Default)]
struct RoomState {
    members: HashSet<String>,
    messages: Vec<StoredMessage>,
}

/// DashMap-backed chat store keyed by room ID.
#[derive(Debug, Default)]
pub struct InMemoryChatRepository {
    rooms: DashMap<String, RoomState>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to `room_id`, creating the room if needed.
    pub fn add_member(&self, room_id: &str, user_id: &str) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .members
            .insert(user_id.to_string());
    }

    /// Messages stored in a room, oldest first.
    pub fn messages_in(&self, room_id: &str) -> Vec<StoredMessage> {
        self.rooms
            .get(room_id)
            .map(|room| room.messages.clone())
            .unwrap_or_default()
    }

    /// Total number of stored messages across all rooms.
    pub fn message_count(&self) -> usize {
        self.rooms.iter().map(|room| room.messages.len()).sum()
    }
}

#[async_trait]
impl ChatUsecase for InMemoryChatRepository {
    async fn send_message(
        &self,
        room_id: &str,
        sender_id: &str,
        message_type: MessageType,
        content: &str,
    ) -> Result<StoredMessage, ChatError> {
        if room_id.is_empty() {
            return Err(ChatError::Invalid("room id is empty".into()));
        }
        if content.trim().is_empty() {
            return Err(ChatError::Invalid("content is empty".into()));
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(ChatError::Invalid(format!(
                "content exceeds {} characters",
                MAX_CONTENT_LENGTH
            )));
        }

        let message = StoredMessage {
            id: Uuid::now_v7().to_string(),
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            message_type,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        // Posting into a room makes the sender a member of it.
        let mut room = self.rooms.entry(room_id.to_string()).or_default();
        room.members.insert(sender_id.to_string());
        room.messages.push(message.clone());

        tracing::debug!(
            room_id = %room_id,
            sender_id = %sender_id,
            message_id = %message.id,
            message_type = %message.message_type,
            "Message stored"
        );

        Ok(message)
    }

    async fn find_rooms_by_user_id(&self, user_id: &str) -> Result<Vec<String>, ChatError> {
        let mut rooms: Vec<String> = self
            .rooms
            .iter()
            .filter(|room| room.members.contains(user_id))
            .map(|room| room.key().clone())
            .collect();
        rooms.sort();
        Ok(rooms)
    }
}
